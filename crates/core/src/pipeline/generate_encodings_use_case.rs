use std::path::Path;

use crate::error::PipelineError;
use crate::recognition::domain::known_face_set::KnownFaceSet;
use crate::recognition::domain::training_source::TrainingSource;
use crate::recognition::infrastructure::encoding_store;

use super::train_known_faces_use_case::TrainKnownFacesUseCase;

/// Trains from a directory of reference images and saves the result as an
/// encodings file for later runs.
pub struct GenerateEncodingsUseCase {
    trainer: TrainKnownFacesUseCase,
}

impl GenerateEncodingsUseCase {
    pub fn new(trainer: TrainKnownFacesUseCase) -> Self {
        Self { trainer }
    }

    pub fn execute(
        &self,
        images_dir: &Path,
        output_path: &Path,
    ) -> Result<KnownFaceSet, PipelineError> {
        if !encoding_store::has_encodings_extension(output_path) {
            return Err(PipelineError::Configuration(format!(
                "output path must end in .fenc: {}",
                output_path.display()
            )));
        }

        let known = self
            .trainer
            .execute(TrainingSource::FromImages(images_dir.to_path_buf()))?;
        encoding_store::save(&known, output_path)?;
        log::info!(
            "Saved {} encodings to {}",
            known.len(),
            output_path.display()
        );
        Ok(known)
    }
}
