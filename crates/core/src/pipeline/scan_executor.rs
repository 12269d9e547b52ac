use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::detection::domain::detection_scanner::DetectionScanner;
use crate::detection::domain::hit_index_set::HitIndexSet;
use crate::error::PipelineError;
use crate::recognition::domain::face_matcher::FaceMatcher;
use crate::recognition::domain::known_face_set::KnownFaceSet;
use crate::video::domain::frame_source::BatchFrameSource;

use super::batch_cursor::BatchCursor;
use super::pipeline_logger::PipelineLogger;
use super::run_summary::RunSummary;

/// Collaborators shared by every batch of a scan. Read-only while scanning.
#[derive(Clone)]
pub struct ScanContext {
    pub source: Arc<dyn BatchFrameSource>,
    pub matcher: Arc<dyn FaceMatcher>,
    pub known: Arc<KnownFaceSet>,
}

/// What to scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanPlan<'a> {
    pub video: &'a Path,
    pub total_frames: usize,
    pub interval: usize,
    pub first: BatchCursor,
}

/// Result of scanning one batch.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchScan {
    pub cursor: BatchCursor,
    pub hits: HitIndexSet,
    pub frames_decoded: usize,
    pub frames_lost: usize,
    pub elapsed_ms: f64,
}

/// Abstracts how the batches of a scan are driven.
///
/// Implementations must return the union of every batch's hits and record
/// every batch in the summary; batch completion order is theirs to choose.
pub trait ScanExecutor: Send {
    fn execute(
        &self,
        context: &ScanContext,
        plan: &ScanPlan<'_>,
        summary: &mut RunSummary,
        logger: &mut dyn PipelineLogger,
    ) -> Result<HitIndexSet, PipelineError>;
}

/// Reads and scans one batch.
pub fn scan_batch(
    context: &ScanContext,
    video: &Path,
    cursor: BatchCursor,
    total_frames: usize,
    interval: usize,
) -> Result<BatchScan, PipelineError> {
    let started = Instant::now();
    let batch = context
        .source
        .next_batch(video, cursor.start, cursor.size, total_frames)
        .map_err(PipelineError::video)?;
    let hits = DetectionScanner::new(context.matcher.as_ref()).scan(
        &batch.frames,
        batch.start,
        interval,
        &context.known,
    )?;

    Ok(BatchScan {
        cursor,
        hits,
        frames_decoded: batch.frames.len(),
        frames_lost: batch.lost_frames,
        elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
    })
}

/// Folds a finished batch into the running totals.
pub(crate) fn record_batch(
    scan: &BatchScan,
    summary: &mut RunSummary,
    logger: &mut dyn PipelineLogger,
) {
    summary.record_batch(scan.cursor.start, scan.frames_decoded, scan.frames_lost);
    logger.timing("scan", scan.elapsed_ms);
    if scan.frames_lost > 0 {
        logger.warn(&format!(
            "Batch at frame {}: {} frames lost to decode errors",
            scan.cursor.start, scan.frames_lost
        ));
    }
}

/// Scans one batch at a time on the calling thread. Peak memory is one
/// batch of frames.
pub struct SequentialScanExecutor;

impl ScanExecutor for SequentialScanExecutor {
    fn execute(
        &self,
        context: &ScanContext,
        plan: &ScanPlan<'_>,
        summary: &mut RunSummary,
        logger: &mut dyn PipelineLogger,
    ) -> Result<HitIndexSet, PipelineError> {
        let mut hits = HitIndexSet::new();
        let mut done = 0;
        for cursor in plan.first.steps(plan.total_frames) {
            logger.batch_started(cursor.start, cursor.size);
            let scan = scan_batch(context, plan.video, cursor, plan.total_frames, plan.interval)?;
            record_batch(&scan, summary, logger);
            done += cursor.end(plan.total_frames) - cursor.start;
            logger.progress(done, plan.total_frames);
            hits.union(scan.hits);
        }
        Ok(hits)
    }
}
