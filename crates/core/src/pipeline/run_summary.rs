use std::fmt;

use crate::clipping::domain::clip_extractor::{ClipFailure, ExtractionReport};

/// Degradable events and counts gathered over one run.
///
/// Lost frames and failed clips end up here instead of aborting the run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    pub batches: usize,
    pub frames_decoded: usize,
    pub frames_lost: usize,
    pub hits: usize,
    pub windows: usize,
    pub clips_written: usize,
    pub clip_failures: Vec<ClipFailure>,
    pub warnings: Vec<String>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_batch(&mut self, start: usize, decoded: usize, lost: usize) {
        self.batches += 1;
        self.frames_decoded += decoded;
        if lost > 0 {
            self.frames_lost += lost;
            self.warnings
                .push(format!("batch at frame {start}: {lost} frames lost"));
        }
    }

    pub fn record_extraction(&mut self, report: &ExtractionReport) {
        self.clips_written += report.written.len();
        for failure in &report.failed {
            self.warnings.push(format!(
                "clip for frames {}..{} failed: {}",
                failure.window.start, failure.window.end, failure.reason
            ));
        }
        self.clip_failures.extend(report.failed.iter().cloned());
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run summary:")?;
        writeln!(f, "  batches:       {}", self.batches)?;
        writeln!(f, "  frames read:   {}", self.frames_decoded)?;
        writeln!(f, "  frames lost:   {}", self.frames_lost)?;
        writeln!(f, "  hits:          {}", self.hits)?;
        writeln!(f, "  windows:       {}", self.windows)?;
        writeln!(f, "  clips written: {}", self.clips_written)?;
        write!(f, "  clips failed:  {}", self.clip_failures.len())?;
        for warning in &self.warnings {
            write!(f, "\n  warning: {warning}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipping::domain::clip_window::ClipWindow;
    use std::path::PathBuf;

    #[test]
    fn test_record_batch_accumulates() {
        let mut summary = RunSummary::new();
        summary.record_batch(0, 100, 0);
        summary.record_batch(100, 40, 60);

        assert_eq!(summary.batches, 2);
        assert_eq!(summary.frames_decoded, 140);
        assert_eq!(summary.frames_lost, 60);
        assert_eq!(summary.warnings, vec!["batch at frame 100: 60 frames lost"]);
    }

    #[test]
    fn test_record_extraction_keeps_failures() {
        let mut summary = RunSummary::new();
        summary.record_extraction(&ExtractionReport {
            written: vec![PathBuf::from("a.mp4")],
            failed: vec![ClipFailure {
                window: ClipWindow::new(10, 40),
                reason: "disk full".into(),
            }],
        });

        assert_eq!(summary.clips_written, 1);
        assert_eq!(summary.clip_failures.len(), 1);
        assert!(summary.has_warnings());
        assert!(summary.warnings[0].contains("10..40"));
    }

    #[test]
    fn test_display_lists_counts_and_warnings() {
        let mut summary = RunSummary::new();
        summary.record_batch(0, 10, 2);
        summary.hits = 3;
        let text = summary.to_string();
        assert!(text.starts_with("Run summary:"));
        assert!(text.contains("hits:          3"));
        assert!(text.contains("warning: batch at frame 0: 2 frames lost"));
    }

    #[test]
    fn test_clean_run_has_no_warnings() {
        let mut summary = RunSummary::new();
        summary.record_batch(0, 10, 0);
        assert!(!summary.has_warnings());
    }
}
