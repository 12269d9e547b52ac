//! Sorted interval merge.

use crate::clipping::domain::clip_window::ClipWindow;
use crate::clipping::domain::window_expander::expand_all;
use crate::detection::domain::hit_index_set::HitIndexSet;
use crate::error::PipelineError;

/// Expands every hit into a candidate window and merges the candidates into
/// a sorted list of pairwise disjoint windows.
///
/// An empty hit set is rejected with [`PipelineError::EmptyHitSet`] so callers
/// can tell "no detections" apart from "nothing to clip".
pub fn merge(
    hits: &HitIndexSet,
    clip_length: usize,
    video_length: usize,
) -> Result<Vec<ClipWindow>, PipelineError> {
    if hits.is_empty() {
        return Err(PipelineError::EmptyHitSet);
    }
    Ok(merge_windows(expand_all(hits, clip_length, video_length)?))
}

/// Merges windows that overlap or touch. The result is sorted by start, its
/// windows are pairwise disjoint and together cover exactly the input.
pub fn merge_windows(mut windows: Vec<ClipWindow>) -> Vec<ClipWindow> {
    windows.sort();

    let mut merged: Vec<ClipWindow> = Vec::with_capacity(windows.len());
    for candidate in windows {
        match merged.last_mut() {
            Some(running) if running.overlaps(&candidate) => {
                running.end = running.end.max(candidate.end);
            }
            _ => merged.push(candidate),
        }
    }
    merged
}
