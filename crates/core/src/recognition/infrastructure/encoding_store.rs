//! Binary persistence of a [`KnownFaceSet`].
//!
//! The file is a bincode-encoded [`EncodingFile`]: a magic tag, a format
//! version, the shared encoding dimension and the encodings themselves.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::recognition::domain::encoding::Encoding;
use crate::recognition::domain::known_face_set::KnownFaceSet;
use crate::shared::constants::ENCODINGS_EXTENSION;

const MAGIC: [u8; 4] = *b"FTEN";
const FORMAT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum EncodingStoreError {
    #[error("encodings file must end in .fenc: {0}")]
    Extension(PathBuf),
    #[error("refusing to save an empty encoding collection")]
    Empty,
    #[error("encodings have mixed dimensions ({expected} and {found})")]
    MixedDimensions { expected: usize, found: usize },
    #[error("{path} is not an encodings file")]
    NotAnEncodingsFile { path: PathBuf },
    #[error("{path} uses unsupported format version {version}")]
    UnsupportedVersion { path: PathBuf, version: u32 },
    #[error("{path} contains no encodings")]
    EmptyFile { path: PathBuf },
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },
    #[error("failed to encode encodings: {0}")]
    Encode(#[source] bincode::Error),
}

#[derive(Serialize, Deserialize)]
struct EncodingFile {
    magic: [u8; 4],
    version: u32,
    dimension: u32,
    encodings: Vec<Encoding>,
}

pub fn has_encodings_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ENCODINGS_EXTENSION))
}

pub fn save(known: &KnownFaceSet, path: &Path) -> Result<(), EncodingStoreError> {
    if !has_encodings_extension(path) {
        return Err(EncodingStoreError::Extension(path.to_path_buf()));
    }
    let dimension = shared_dimension(known.encodings())?;

    let file = EncodingFile {
        magic: MAGIC,
        version: FORMAT_VERSION,
        dimension: dimension as u32,
        encodings: known.encodings().to_vec(),
    };
    let bytes = bincode::serialize(&file).map_err(EncodingStoreError::Encode)?;
    fs::write(path, bytes).map_err(|source| EncodingStoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    log::debug!(
        "Saved {} encodings ({dimension}-d) to {}",
        known.len(),
        path.display()
    );
    Ok(())
}

pub fn load(path: &Path) -> Result<KnownFaceSet, EncodingStoreError> {
    let bytes = fs::read(path).map_err(|source| EncodingStoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if !bytes.starts_with(&MAGIC) {
        return Err(EncodingStoreError::NotAnEncodingsFile {
            path: path.to_path_buf(),
        });
    }

    let file: EncodingFile =
        bincode::deserialize(&bytes).map_err(|source| EncodingStoreError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
    if file.version != FORMAT_VERSION {
        return Err(EncodingStoreError::UnsupportedVersion {
            path: path.to_path_buf(),
            version: file.version,
        });
    }
    if file.encodings.is_empty() {
        return Err(EncodingStoreError::EmptyFile {
            path: path.to_path_buf(),
        });
    }
    let dimension = shared_dimension(&file.encodings)?;
    if dimension != file.dimension as usize {
        return Err(EncodingStoreError::MixedDimensions {
            expected: file.dimension as usize,
            found: dimension,
        });
    }

    log::debug!(
        "Loaded {} encodings ({dimension}-d) from {}",
        file.encodings.len(),
        path.display()
    );
    Ok(KnownFaceSet::from_encodings(file.encodings))
}

fn shared_dimension(encodings: &[Encoding]) -> Result<usize, EncodingStoreError> {
    let first = encodings.first().ok_or(EncodingStoreError::Empty)?;
    let expected = first.dimension();
    match encodings.iter().find(|e| e.dimension() != expected) {
        Some(other) => Err(EncodingStoreError::MixedDimensions {
            expected,
            found: other.dimension(),
        }),
        None => Ok(expected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_set() -> KnownFaceSet {
        KnownFaceSet::from_encodings(vec![
            Encoding::new(vec![0.25, -0.5, 0.125, 1.0e-7]),
            Encoding::new(vec![f32::MIN_POSITIVE, 0.0, -0.0, 0.75]),
        ])
    }

    #[test]
    fn test_load_returns_what_was_saved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("faces.fenc");
        let known = sample_set();

        save(&known, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded, known);
    }

    #[test]
    fn test_save_rejects_wrong_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("faces.pkl");
        let result = save(&sample_set(), &path);
        assert!(matches!(result, Err(EncodingStoreError::Extension(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_save_rejects_empty_set() {
        let dir = TempDir::new().unwrap();
        let result = save(&KnownFaceSet::new(), &dir.path().join("faces.fenc"));
        assert!(matches!(result, Err(EncodingStoreError::Empty)));
    }

    #[test]
    fn test_save_rejects_mixed_dimensions() {
        let dir = TempDir::new().unwrap();
        let known = KnownFaceSet::from_encodings(vec![
            Encoding::new(vec![1.0, 0.0]),
            Encoding::new(vec![1.0, 0.0, 0.0]),
        ]);
        let result = save(&known, &dir.path().join("faces.fenc"));
        assert!(matches!(
            result,
            Err(EncodingStoreError::MixedDimensions {
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn test_load_rejects_foreign_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("faces.fenc");
        fs::write(&path, b"definitely not encodings").unwrap();
        assert!(matches!(
            load(&path),
            Err(EncodingStoreError::NotAnEncodingsFile { .. })
        ));
    }

    #[test]
    fn test_load_rejects_truncated_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("faces.fenc");
        save(&sample_set(), &path).unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();
        assert!(matches!(load(&path), Err(EncodingStoreError::Decode { .. })));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = load(Path::new("/nonexistent/faces.fenc"));
        assert!(matches!(result, Err(EncodingStoreError::Io { .. })));
    }

    #[test]
    fn test_extension_check_is_case_insensitive() {
        assert!(has_encodings_extension(Path::new("a/b.fenc")));
        assert!(has_encodings_extension(Path::new("a/b.FENC")));
        assert!(!has_encodings_extension(Path::new("a/b.fenc.txt")));
        assert!(!has_encodings_extension(Path::new("a/fenc")));
    }
}
