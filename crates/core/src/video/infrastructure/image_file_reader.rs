use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BoxError;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::video::domain::image_reader::ImageReader;

/// Decodes reference images with the `image` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageFileReader;

impl ImageFileReader {
    pub fn new() -> Self {
        Self
    }
}

impl ImageReader for ImageFileReader {
    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>, BoxError> {
        Ok(list_images(dir)?)
    }

    fn read(&self, path: &Path) -> Result<Frame, BoxError> {
        let rgb = image::open(path)?.into_rgb8();
        let (width, height) = rgb.dimensions();
        Ok(Frame::new(rgb.into_raw(), width, height, 0))
    }
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Image files directly inside `dir`, sorted by path. Other entries are
/// skipped.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut images = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image_file(&path) {
            images.push(path);
        } else {
            log::debug!("Skipping non-image entry {}", path.display());
        }
    }
    images.sort();
    Ok(images)
}
