use std::collections::BTreeMap;
use std::time::Instant;

/// Per-run observer for pipeline events.
///
/// One instance is created for a run, passed by reference into each use
/// case, and dropped when the run ends.
pub trait PipelineLogger: Send {
    /// A batch covering `[start, start + size)` is about to be scanned.
    fn batch_started(&mut self, start: usize, size: usize);

    /// `done` of `total` frames have been scanned.
    fn progress(&mut self, done: usize, total: usize);

    /// How long one execution of a named stage took.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// A degradable problem (lost frames, failed clip).
    fn warn(&mut self, message: &str);

    fn info(&mut self, message: &str);

    /// End-of-run report. Default: no-op.
    fn summary(&self) {}
}

/// Discards every event.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn batch_started(&mut self, _start: usize, _size: usize) {}
    fn progress(&mut self, _done: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn warn(&mut self, _message: &str) {}
    fn info(&mut self, _message: &str) {}
}

/// Forwards events to the `log` facade and keeps per-stage timings for an
/// end-of-run summary.
pub struct StdoutPipelineLogger {
    timings: BTreeMap<String, Vec<f64>>,
    warnings: Vec<String>,
    start_time: Instant,
    frames_done: usize,
}

impl StdoutPipelineLogger {
    pub fn new() -> Self {
        Self {
            timings: BTreeMap::new(),
            warnings: Vec::new(),
            start_time: Instant::now(),
            frames_done: 0,
        }
    }

    /// Formatted summary, or `None` before anything was timed.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Pipeline summary ({} frames, {:.1}s total):",
            self.frames_done,
            elapsed_ms / 1000.0
        )];

        for (stage, durations) in &self.timings {
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            lines.push(format!(
                "  {stage:12}: {:4}x  avg {avg_ms:8.1}ms  total {total_ms:9.0}ms",
                durations.len()
            ));
        }

        if self.frames_done > 0 && elapsed_ms > 0.0 {
            let fps = self.frames_done as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }
        if !self.warnings.is_empty() {
            lines.push(format!("  Warnings: {}", self.warnings.len()));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn batch_started(&mut self, start: usize, size: usize) {
        log::debug!("Scanning frames {start}..{}", start + size);
    }

    fn progress(&mut self, done: usize, total: usize) {
        self.frames_done = done;
        if total > 0 {
            let pct = done as f64 / total as f64 * 100.0;
            log::info!("Scanned {done}/{total} frames ({pct:.1}%)");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn warn(&mut self, message: &str) {
        self.warnings.push(message.to_string());
        log::warn!("{message}");
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
