use std::path::Path;
use std::sync::Arc;

use crate::error::PipelineError;
use crate::recognition::domain::face_matcher::FaceMatcher;
use crate::recognition::domain::known_face_set::KnownFaceSet;
use crate::recognition::domain::training_source::TrainingSource;
use crate::recognition::infrastructure::encoding_store;
use crate::video::domain::image_reader::ImageReader;

/// Builds a run's [`KnownFaceSet`] from exactly one [`TrainingSource`].
///
/// The returned set is fresh for every call and never empty: a source that
/// yields no encodings fails with [`PipelineError::NoKnownFaces`].
pub struct TrainKnownFacesUseCase {
    matcher: Arc<dyn FaceMatcher>,
    images: Box<dyn ImageReader>,
}

impl TrainKnownFacesUseCase {
    pub fn new(matcher: Arc<dyn FaceMatcher>, images: Box<dyn ImageReader>) -> Self {
        Self { matcher, images }
    }

    pub fn execute(&self, source: TrainingSource) -> Result<KnownFaceSet, PipelineError> {
        log::info!("Training from {}", source.describe());
        let known = match source {
            TrainingSource::FromImages(dir) => self.train_from_images(&dir)?,
            TrainingSource::FromEncodingsFile(path) => {
                if !encoding_store::has_encodings_extension(&path) {
                    return Err(PipelineError::Configuration(format!(
                        "encodings file must end in .fenc: {}",
                        path.display()
                    )));
                }
                encoding_store::load(&path)?
            }
            TrainingSource::FromEncodings(encodings) => KnownFaceSet::from_encodings(encodings),
            TrainingSource::Pretrained(known) => known,
        };

        if known.is_empty() {
            return Err(PipelineError::NoKnownFaces);
        }
        log::info!("Known face set holds {} encodings", known.len());
        Ok(known)
    }

    fn train_from_images(&self, dir: &Path) -> Result<KnownFaceSet, PipelineError> {
        if !dir.is_dir() {
            return Err(PipelineError::Configuration(format!(
                "images directory does not exist: {}",
                dir.display()
            )));
        }
        let paths = self.images.list(dir).map_err(|e| {
            PipelineError::Configuration(format!("cannot list {}: {e}", dir.display()))
        })?;

        let mut known = KnownFaceSet::new();
        for path in paths {
            let frame = match self.images.read(&path) {
                Ok(frame) => frame,
                Err(e) => {
                    log::warn!("Skipping unreadable image {}: {e}", path.display());
                    continue;
                }
            };
            let encodings = self.matcher.encode(&frame).map_err(PipelineError::matcher)?;
            if encodings.is_empty() {
                log::warn!("No face found in {}", path.display());
            } else {
                log::debug!("{} face(s) in {}", encodings.len(), path.display());
            }
            known.extend(encodings);
        }
        Ok(known)
    }
}
