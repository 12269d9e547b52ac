use std::path::Path;

use crate::error::BoxError;

/// Builds an ONNX Runtime session for one of the matcher models.
///
/// Uses the platform's accelerator when one exists (CoreML on macOS,
/// DirectML on Windows) and ONNX Runtime's CPU provider otherwise.
pub fn build_session(model_path: &Path) -> Result<ort::session::Session, BoxError> {
    if !model_path.is_file() {
        return Err(format!("model file not found: {}", model_path.display()).into());
    }
    let intra_threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let session = ort::session::Session::builder()?
        .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
        .with_inter_threads(1)?
        .with_intra_threads(intra_threads)?
        .with_execution_providers(preferred_execution_providers())?
        .commit_from_file(model_path)?;
    Ok(session)
}

fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}
