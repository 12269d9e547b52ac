use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::detection::domain::hit_index_set::HitIndexSet;
use crate::error::PipelineError;
use crate::recognition::domain::training_source::TrainingSource;

use super::pipeline_logger::PipelineLogger;
use super::run_summary::RunSummary;
use super::scan_video_use_case::{ScanMode, ScanVideoUseCase};
use super::train_known_faces_use_case::TrainKnownFacesUseCase;

/// Scans a whole video and writes the sorted hit frames as `[i0, i1, ...]`.
pub struct DetectFacesUseCase {
    trainer: TrainKnownFacesUseCase,
    scanner: ScanVideoUseCase,
}

impl DetectFacesUseCase {
    pub fn new(trainer: TrainKnownFacesUseCase, scanner: ScanVideoUseCase) -> Self {
        Self { trainer, scanner }
    }

    pub fn execute(
        &self,
        training: TrainingSource,
        video: &Path,
        interval: usize,
        output_path: &Path,
        logger: &mut dyn PipelineLogger,
    ) -> Result<HitIndexSet, PipelineError> {
        let known = Arc::new(self.trainer.execute(training)?);
        let mut summary = RunSummary::new();
        let scan = self.scanner.execute(
            video,
            known,
            interval,
            ScanMode::WholeVideo,
            &mut summary,
            logger,
        )?;

        fs::write(output_path, scan.hits.to_string()).map_err(|source| PipelineError::Io {
            path: output_path.to_path_buf(),
            source,
        })?;
        logger.info(&format!(
            "Wrote {} hit frames to {}",
            scan.hits.len(),
            output_path.display()
        ));
        logger.summary();
        Ok(scan.hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::pipeline::scan_executor::test_support::*;
    use crate::pipeline::scan_executor::SequentialScanExecutor;
    use crate::shared::frame::Frame;
    use crate::video::domain::image_reader::ImageReader;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct NoImages;

    impl ImageReader for NoImages {
        fn list(&self, _dir: &Path) -> Result<Vec<PathBuf>, BoxError> {
            Ok(Vec::new())
        }

        fn read(&self, _path: &Path) -> Result<Frame, BoxError> {
            Err("no images".into())
        }
    }

    fn use_case(total: usize, faces_at: &[usize]) -> DetectFacesUseCase {
        let matcher = Arc::new(StubMatcher::new(faces_at));
        DetectFacesUseCase::new(
            TrainKnownFacesUseCase::new(matcher.clone(), Box::new(NoImages)),
            ScanVideoUseCase::new(
                Arc::new(StubFrameSource::new(total)),
                matcher,
                Box::new(SequentialScanExecutor),
            ),
        )
    }

    #[test]
    fn test_writes_sorted_hit_list() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("hits.txt");

        let hits = use_case(100, &[70, 20, 30, 25])
            .execute(
                TrainingSource::Pretrained(known_set()),
                Path::new("video.mp4"),
                10,
                &out,
                &mut NullPipelineLogger,
            )
            .unwrap();

        assert_eq!(hits.to_vec(), vec![20, 30, 70]);
        assert_eq!(fs::read_to_string(&out).unwrap(), "[20, 30, 70]");
    }

    #[test]
    fn test_no_hits_writes_empty_list() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("hits.txt");
        use_case(50, &[])
            .execute(
                TrainingSource::Pretrained(known_set()),
                Path::new("video.mp4"),
                10,
                &out,
                &mut NullPipelineLogger,
            )
            .unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "[]");
    }

    #[test]
    fn test_unwritable_output_is_io_error() {
        let result = use_case(10, &[0]).execute(
            TrainingSource::Pretrained(known_set()),
            Path::new("video.mp4"),
            10,
            Path::new("/nonexistent/dir/hits.txt"),
            &mut NullPipelineLogger,
        );
        assert!(matches!(result, Err(PipelineError::Io { .. })));
    }
}
