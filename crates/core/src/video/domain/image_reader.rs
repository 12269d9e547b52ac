use std::path::{Path, PathBuf};

use crate::error::BoxError;
use crate::shared::frame::Frame;

/// Access to still reference images.
pub trait ImageReader: Send + Sync {
    /// Reference image files directly inside `dir`, in a stable order.
    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>, BoxError>;

    /// Decodes one image into an RGB24 frame.
    fn read(&self, path: &Path) -> Result<Frame, BoxError>;
}
