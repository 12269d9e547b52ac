use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::detection::domain::hit_index_set::HitIndexSet;
use crate::error::PipelineError;
use crate::recognition::domain::face_matcher::FaceMatcher;
use crate::recognition::domain::known_face_set::KnownFaceSet;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_source::BatchFrameSource;

use super::batch_cursor::BatchCursor;
use super::pipeline_logger::PipelineLogger;
use super::run_summary::RunSummary;
use super::scan_executor::{ScanContext, ScanExecutor, ScanPlan};

/// How a video is divided into batches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanMode {
    /// One batch spanning the whole video.
    WholeVideo,
    /// Batches of at most `batch_size` frames.
    Batched { batch_size: usize },
}

impl ScanMode {
    fn first_cursor(self, total_frames: usize) -> Result<BatchCursor, PipelineError> {
        match self {
            Self::WholeVideo => Ok(BatchCursor::whole_video(total_frames)),
            Self::Batched { batch_size: 0 } => Err(PipelineError::InvalidArgument(
                "batch size must be greater than 0".into(),
            )),
            Self::Batched { batch_size } => Ok(BatchCursor::first(batch_size)),
        }
    }
}

/// Everything learned from scanning one video.
#[derive(Clone, Debug)]
pub struct ScanResult {
    pub metadata: VideoMetadata,
    pub hits: HitIndexSet,
}

/// Scans a video for the known identity and returns every hit frame.
///
/// Whole-video and batched modes yield the same hit set for the same video,
/// interval and known faces.
pub struct ScanVideoUseCase {
    source: Arc<dyn BatchFrameSource>,
    matcher: Arc<dyn FaceMatcher>,
    executor: Box<dyn ScanExecutor>,
}

impl ScanVideoUseCase {
    pub fn new(
        source: Arc<dyn BatchFrameSource>,
        matcher: Arc<dyn FaceMatcher>,
        executor: Box<dyn ScanExecutor>,
    ) -> Self {
        Self {
            source,
            matcher,
            executor,
        }
    }

    pub fn execute(
        &self,
        video: &Path,
        known: Arc<KnownFaceSet>,
        interval: usize,
        mode: ScanMode,
        summary: &mut RunSummary,
        logger: &mut dyn PipelineLogger,
    ) -> Result<ScanResult, PipelineError> {
        if known.is_empty() {
            return Err(PipelineError::NoKnownFaces);
        }
        if interval == 0 {
            return Err(PipelineError::InvalidArgument(
                "frame interval must be greater than 0".into(),
            ));
        }

        let metadata = self.source.probe(video).map_err(PipelineError::video)?;
        let first = mode.first_cursor(metadata.total_frames)?;
        logger.info(&format!(
            "Scanning {} ({} frames, every {interval}th frame, {} frames per batch)",
            video.display(),
            metadata.total_frames,
            first.size
        ));

        let context = ScanContext {
            source: self.source.clone(),
            matcher: self.matcher.clone(),
            known,
        };
        let plan = ScanPlan {
            video,
            total_frames: metadata.total_frames,
            interval,
            first,
        };

        let started = Instant::now();
        let hits = self.executor.execute(&context, &plan, summary, logger)?;
        logger.timing("scan_total", started.elapsed().as_secs_f64() * 1000.0);

        summary.hits = hits.len();
        logger.info(&format!("Found the known face in {} sampled frames", hits.len()));
        Ok(ScanResult { metadata, hits })
    }
}
