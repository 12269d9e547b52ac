use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::clipping::domain::clip_window::ClipWindow;
use crate::error::PipelineError;
use crate::shared::constants::CLIP_EXTENSION;
use crate::video::domain::clip_writer::ClipWriter;

/// A window that could not be written.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipFailure {
    pub window: ClipWindow,
    pub reason: String,
}

/// Outcome of extracting a list of windows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtractionReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<ClipFailure>,
}

/// Materialises clip windows as files through a [`ClipWriter`].
pub struct ClipExtractor<'a> {
    writer: &'a dyn ClipWriter,
}

impl<'a> ClipExtractor<'a> {
    pub fn new(writer: &'a dyn ClipWriter) -> Self {
        Self { writer }
    }

    /// Writes one clip per window into `output_dir`, in window order.
    ///
    /// A window that fails to write is logged and recorded in the report;
    /// the remaining windows are still attempted.
    pub fn extract(
        &self,
        source: &Path,
        windows: &[ClipWindow],
        fps: f64,
        output_dir: &Path,
    ) -> Result<ExtractionReport, PipelineError> {
        if fps.is_nan() || fps <= 0.0 {
            return Err(PipelineError::InvalidArgument(format!(
                "frame rate must be positive, got {fps}"
            )));
        }

        let mut report = ExtractionReport::default();
        for window in windows {
            let (start_secs, end_secs) = window_seconds(window, fps);
            let output = unique_clip_path(output_dir, &Local::now());
            log::info!(
                "Writing clip {}: frames {}..{} ({start_secs:.2}s to {end_secs:.2}s)",
                output.display(),
                window.start,
                window.end
            );
            match self
                .writer
                .write_subclip(source, &output, start_secs, end_secs)
            {
                Ok(()) => report.written.push(output),
                Err(e) => {
                    log::warn!(
                        "Failed to write clip for frames {}..{}: {e}",
                        window.start,
                        window.end
                    );
                    report.failed.push(ClipFailure {
                        window: *window,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }
}

/// `(start, end)` of a window in seconds.
pub fn window_seconds(window: &ClipWindow, fps: f64) -> (f64, f64) {
    (window.start as f64 / fps, window.end as f64 / fps)
}

/// `2024-05-01_13-45-09,123` for the given instant.
pub fn clip_stem(at: &DateTime<Local>) -> String {
    format!(
        "{},{:03}",
        at.format("%Y-%m-%d_%H-%M-%S"),
        at.timestamp_subsec_millis()
    )
}

/// Timestamp-named clip path inside `dir`, suffixed `_1`, `_2`, ... when the
/// name is already taken.
pub fn unique_clip_path(dir: &Path, at: &DateTime<Local>) -> PathBuf {
    let stem = clip_stem(at);
    let mut candidate = dir.join(format!("{stem}.{CLIP_EXTENSION}"));
    let mut suffix = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{stem}_{suffix}.{CLIP_EXTENSION}"));
        suffix += 1;
    }
    candidate
}
