use std::path::Path;

use crate::error::BoxError;

/// Cuts a time range out of a source video into its own file.
pub trait ClipWriter: Send + Sync {
    /// Writes `[start_secs, end_secs)` of `source` to `output`.
    fn write_subclip(
        &self,
        source: &Path,
        output: &Path,
        start_secs: f64,
        end_secs: f64,
    ) -> Result<(), BoxError>;
}
