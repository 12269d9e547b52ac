use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::detection::domain::hit_index_set::HitIndexSet;
use crate::error::PipelineError;
use crate::pipeline::batch_cursor::BatchCursor;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::run_summary::RunSummary;
use crate::pipeline::scan_executor::{
    record_batch, scan_batch, BatchScan, ScanContext, ScanExecutor, ScanPlan,
};

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

enum WorkerEvent {
    Started(BatchCursor),
    Finished(Box<Result<BatchScan, PipelineError>>),
}

/// Scans batches on a fixed pool of worker threads.
///
/// Layout: `feeder → [worker × N] → main [union + summary]`
///
/// Each worker reads and scans whole batches independently and sends back a
/// partial hit set; only the main thread touches the accumulator. Peak
/// memory is `workers` batches of frames.
pub struct ThreadedScanExecutor {
    workers: usize,
    channel_capacity: usize,
}

impl ThreadedScanExecutor {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Default for ThreadedScanExecutor {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(workers)
    }
}

impl ScanExecutor for ThreadedScanExecutor {
    fn execute(
        &self,
        context: &ScanContext,
        plan: &ScanPlan<'_>,
        summary: &mut RunSummary,
        logger: &mut dyn PipelineLogger,
    ) -> Result<HitIndexSet, PipelineError> {
        let (job_tx, job_rx) = crossbeam_channel::bounded::<BatchCursor>(self.workers);
        let (event_tx, event_rx) =
            crossbeam_channel::bounded::<WorkerEvent>(self.channel_capacity.max(self.workers));
        let cancelled = Arc::new(AtomicBool::new(false));

        let feeder = spawn_feeder(plan.first, plan.total_frames, job_tx, cancelled.clone());
        let workers: Vec<_> = (0..self.workers)
            .map(|_| {
                spawn_worker(
                    context.clone(),
                    plan.video.to_path_buf(),
                    plan.total_frames,
                    plan.interval,
                    job_rx.clone(),
                    event_tx.clone(),
                    cancelled.clone(),
                )
            })
            .collect();
        drop(job_rx);
        drop(event_tx);

        let result = collect_events(event_rx, plan.total_frames, summary, logger);
        if result.is_err() {
            cancelled.store(true, Ordering::Relaxed);
        }

        join_threads(feeder, workers, result)
    }
}

fn spawn_feeder(
    first: BatchCursor,
    total_frames: usize,
    job_tx: crossbeam_channel::Sender<BatchCursor>,
    cancelled: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for cursor in first.steps(total_frames) {
            if cancelled.load(Ordering::Relaxed) || job_tx.send(cursor).is_err() {
                break;
            }
        }
    })
}

fn spawn_worker(
    context: ScanContext,
    video: PathBuf,
    total_frames: usize,
    interval: usize,
    job_rx: crossbeam_channel::Receiver<BatchCursor>,
    event_tx: crossbeam_channel::Sender<WorkerEvent>,
    cancelled: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for cursor in job_rx {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }
            if event_tx.send(WorkerEvent::Started(cursor)).is_err() {
                break;
            }
            let result = scan_batch(&context, &video, cursor, total_frames, interval);
            let failed = result.is_err();
            if event_tx
                .send(WorkerEvent::Finished(Box::new(result)))
                .is_err()
                || failed
            {
                break;
            }
        }
    })
}

/// Unions partial hit sets as batches finish. Returns on the first error;
/// dropping the receiver then stops the workers.
fn collect_events(
    event_rx: crossbeam_channel::Receiver<WorkerEvent>,
    total_frames: usize,
    summary: &mut RunSummary,
    logger: &mut dyn PipelineLogger,
) -> Result<HitIndexSet, PipelineError> {
    let mut hits = HitIndexSet::new();
    let mut done = 0;

    for event in event_rx {
        match event {
            WorkerEvent::Started(cursor) => logger.batch_started(cursor.start, cursor.size),
            WorkerEvent::Finished(result) => {
                let scan = (*result)?;
                record_batch(&scan, summary, logger);
                done += scan.cursor.end(total_frames) - scan.cursor.start;
                logger.progress(done, total_frames);
                hits.union(scan.hits);
            }
        }
    }
    Ok(hits)
}

/// Joins every thread and keeps the first error encountered.
fn join_threads(
    feeder: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
    result: Result<HitIndexSet, PipelineError>,
) -> Result<HitIndexSet, PipelineError> {
    let mut panicked = feeder.join().is_err().then_some("Feeder thread panicked");
    for worker in workers {
        if worker.join().is_err() && panicked.is_none() {
            panicked = Some("Scan worker thread panicked");
        }
    }

    match (result, panicked) {
        (Err(e), _) => Err(e),
        (Ok(_), Some(message)) => Err(PipelineError::Worker(message.to_string())),
        (Ok(hits), None) => Ok(hits),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::pipeline::scan_executor::test_support::*;
    use crate::pipeline::scan_executor::SequentialScanExecutor;
    use crate::recognition::domain::encoding::Encoding;
    use crate::recognition::domain::face_matcher::FaceMatcher;
    use crate::recognition::domain::known_face_set::KnownFaceSet;
    use crate::shared::frame::Frame;
    use rstest::rstest;
    use std::path::Path;

    fn context(total: usize, faces_at: &[usize]) -> ScanContext {
        ScanContext {
            source: Arc::new(StubFrameSource::new(total)),
            matcher: Arc::new(StubMatcher::new(faces_at)),
            known: Arc::new(known_set()),
        }
    }

    fn run(
        executor: &dyn ScanExecutor,
        ctx: &ScanContext,
        total: usize,
        interval: usize,
        first: BatchCursor,
    ) -> (Result<HitIndexSet, PipelineError>, RunSummary) {
        let mut summary = RunSummary::new();
        let plan = ScanPlan {
            video: Path::new("video.mp4"),
            total_frames: total,
            interval,
            first,
        };
        let result = executor.execute(ctx, &plan, &mut summary, &mut NullPipelineLogger);
        (result, summary)
    }

    #[rstest]
    #[case(1, 1)]
    #[case(2, 7)]
    #[case(4, 10)]
    #[case(3, 33)]
    #[case(8, 500)]
    fn test_matches_sequential_executor(#[case] workers: usize, #[case] batch_size: usize) {
        let faces: Vec<usize> = (0..250).filter(|i| i % 7 == 0).collect();
        let ctx = context(250, &faces);

        let (expected, expected_summary) =
            run(&SequentialScanExecutor, &ctx, 250, 10, BatchCursor::first(batch_size));
        let (actual, summary) = run(
            &ThreadedScanExecutor::new(workers),
            &ctx,
            250,
            10,
            BatchCursor::first(batch_size),
        );

        assert_eq!(actual.unwrap(), expected.unwrap());
        assert_eq!(summary.batches, expected_summary.batches);
        assert_eq!(summary.frames_decoded, expected_summary.frames_decoded);
    }

    #[test]
    fn test_empty_video_yields_no_hits() {
        let ctx = context(0, &[]);
        let (hits, summary) = run(
            &ThreadedScanExecutor::new(4),
            &ctx,
            0,
            10,
            BatchCursor::whole_video(0),
        );
        assert!(hits.unwrap().is_empty());
        assert_eq!(summary.batches, 0);
    }

    struct FailingMatcher;

    impl FaceMatcher for FailingMatcher {
        fn encode(&self, frame: &Frame) -> Result<Vec<Encoding>, BoxError> {
            if frame.index() >= 40 {
                Err("model crashed".into())
            } else {
                Ok(Vec::new())
            }
        }

        fn matches(&self, _known: &KnownFaceSet, _encoding: &Encoding) -> bool {
            false
        }
    }

    #[test]
    fn test_worker_error_is_returned() {
        let ctx = ScanContext {
            source: Arc::new(StubFrameSource::new(200)),
            matcher: Arc::new(FailingMatcher),
            known: Arc::new(known_set()),
        };
        let (result, _) = run(
            &ThreadedScanExecutor::new(3),
            &ctx,
            200,
            10,
            BatchCursor::first(20),
        );
        assert!(matches!(result, Err(PipelineError::Matcher(_))));
    }

    #[test]
    fn test_empty_known_set_is_fatal() {
        let ctx = ScanContext {
            source: Arc::new(StubFrameSource::new(50)),
            matcher: Arc::new(StubMatcher::new(&[])),
            known: Arc::new(KnownFaceSet::new()),
        };
        let (result, _) = run(
            &ThreadedScanExecutor::new(2),
            &ctx,
            50,
            10,
            BatchCursor::first(10),
        );
        assert!(matches!(result, Err(PipelineError::NoKnownFaces)));
    }

    #[test]
    fn test_worker_count_is_at_least_one() {
        assert_eq!(ThreadedScanExecutor::new(0).workers(), 1);
        assert!(ThreadedScanExecutor::default().workers() >= 1);
    }
}
