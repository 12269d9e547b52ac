use std::path::Path;
use std::time::Instant;

use crate::clipping::domain::clip_extractor::{ClipExtractor, ExtractionReport};
use crate::clipping::domain::clip_window::ClipWindow;
use crate::clipping::domain::range_merger;
use crate::detection::domain::hit_index_set::HitIndexSet;
use crate::error::PipelineError;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::clip_writer::ClipWriter;

use super::pipeline_logger::PipelineLogger;
use super::run_summary::RunSummary;

/// Terminal outcome of clip extraction.
#[derive(Clone, Debug, PartialEq)]
pub enum ClipOutcome {
    /// The known face was never matched; nothing to extract.
    NoMatches,
    Extracted {
        windows: Vec<ClipWindow>,
        report: ExtractionReport,
    },
}

/// Turns hit frames into merged windows and writes one clip per window.
pub struct ExtractClipsUseCase {
    writer: Box<dyn ClipWriter>,
}

impl ExtractClipsUseCase {
    pub fn new(writer: Box<dyn ClipWriter>) -> Self {
        Self { writer }
    }

    pub fn execute(
        &self,
        hits: &HitIndexSet,
        metadata: &VideoMetadata,
        clip_length: usize,
        output_dir: &Path,
        summary: &mut RunSummary,
        logger: &mut dyn PipelineLogger,
    ) -> Result<ClipOutcome, PipelineError> {
        let source = metadata.source_path.as_deref().ok_or_else(|| {
            PipelineError::InvalidArgument("video metadata has no source path".into())
        })?;

        let windows = match range_merger::merge(hits, clip_length, metadata.total_frames) {
            Ok(windows) => windows,
            Err(PipelineError::EmptyHitSet) => {
                logger.info("No matches found; no clips to extract");
                return Ok(ClipOutcome::NoMatches);
            }
            Err(e) => return Err(e),
        };
        summary.windows = windows.len();
        logger.info(&format!(
            "{} hits merged into {} clip windows",
            hits.len(),
            windows.len()
        ));

        let started = Instant::now();
        let report = ClipExtractor::new(self.writer.as_ref()).extract(
            source,
            &windows,
            metadata.fps,
            output_dir,
        )?;
        logger.timing("extract", started.elapsed().as_secs_f64() * 1000.0);

        for failure in &report.failed {
            logger.warn(&format!(
                "Clip for frames {}..{} was skipped: {}",
                failure.window.start, failure.window.end, failure.reason
            ));
        }
        summary.record_extraction(&report);
        Ok(ClipOutcome::Extracted { windows, report })
    }
}
