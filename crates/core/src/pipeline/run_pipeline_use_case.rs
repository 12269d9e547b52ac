use std::path::Path;
use std::sync::Arc;

use crate::clipping::domain::window_expander::MIN_CLIP_LENGTH;
use crate::error::PipelineError;
use crate::recognition::domain::training_source::TrainingSource;

use super::extract_clips_use_case::{ClipOutcome, ExtractClipsUseCase};
use super::pipeline_logger::PipelineLogger;
use super::run_summary::RunSummary;
use super::scan_video_use_case::{ScanMode, ScanVideoUseCase};
use super::train_known_faces_use_case::TrainKnownFacesUseCase;

/// Parameters of one full run.
#[derive(Clone, Debug)]
pub struct RunRequest<'a> {
    pub training: TrainingSource,
    pub video: &'a Path,
    pub interval: usize,
    pub mode: ScanMode,
    pub clip_length: usize,
    pub output_dir: &'a Path,
}

#[derive(Clone, Debug)]
pub struct RunReport {
    pub outcome: ClipOutcome,
    pub summary: RunSummary,
}

/// Train, scan, merge and extract: the full clip pipeline.
pub struct RunPipelineUseCase {
    trainer: TrainKnownFacesUseCase,
    scanner: ScanVideoUseCase,
    extractor: ExtractClipsUseCase,
}

impl RunPipelineUseCase {
    pub fn new(
        trainer: TrainKnownFacesUseCase,
        scanner: ScanVideoUseCase,
        extractor: ExtractClipsUseCase,
    ) -> Self {
        Self {
            trainer,
            scanner,
            extractor,
        }
    }

    pub fn execute(
        &self,
        request: RunRequest<'_>,
        logger: &mut dyn PipelineLogger,
    ) -> Result<RunReport, PipelineError> {
        if !request.output_dir.is_dir() {
            return Err(PipelineError::Configuration(format!(
                "output directory does not exist: {}",
                request.output_dir.display()
            )));
        }
        if request.clip_length < MIN_CLIP_LENGTH {
            return Err(PipelineError::InvalidArgument(format!(
                "clip length must be at least {MIN_CLIP_LENGTH}, got {}",
                request.clip_length
            )));
        }

        let known = Arc::new(self.trainer.execute(request.training)?);

        let mut summary = RunSummary::new();
        let scan = self.scanner.execute(
            request.video,
            known,
            request.interval,
            request.mode,
            &mut summary,
            logger,
        )?;
        let outcome = self.extractor.execute(
            &scan.hits,
            &scan.metadata,
            request.clip_length,
            request.output_dir,
            &mut summary,
            logger,
        )?;

        log::info!("{summary}");
        logger.summary();
        Ok(RunReport { outcome, summary })
    }
}
