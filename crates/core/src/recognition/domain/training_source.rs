use std::path::PathBuf;

use super::encoding::Encoding;
use super::known_face_set::KnownFaceSet;

/// Where a run's [`KnownFaceSet`] comes from. Exactly one source per run.
#[derive(Clone, Debug)]
pub enum TrainingSource {
    /// A directory of reference images; every face found in every image is
    /// added.
    FromImages(PathBuf),
    /// A previously saved encoding collection file.
    FromEncodingsFile(PathBuf),
    /// Encodings already held in memory.
    FromEncodings(Vec<Encoding>),
    /// A set trained earlier; training is a no-op.
    Pretrained(KnownFaceSet),
}

impl TrainingSource {
    pub fn describe(&self) -> String {
        match self {
            Self::FromImages(dir) => format!("reference images in {}", dir.display()),
            Self::FromEncodingsFile(path) => format!("encodings file {}", path.display()),
            Self::FromEncodings(encodings) => format!("{} in-memory encodings", encodings.len()),
            Self::Pretrained(set) => format!("{} pretrained encodings", set.len()),
        }
    }
}
