//! Turns hit indices into candidate clip windows.
//!
//! A window around hit `i` spans `clip_length / 3` frames before the hit and
//! `2 * clip_length / 3` frames after it, clamped to `[0, video_length]`.

use crate::clipping::domain::clip_window::ClipWindow;
use crate::detection::domain::hit_index_set::HitIndexSet;
use crate::error::PipelineError;

/// Shortest clip length whose windows reach past the hit frame.
pub const MIN_CLIP_LENGTH: usize = 3;

/// Candidate window for a single hit. Integer frame arithmetic throughout.
pub fn expand(hit: usize, clip_length: usize, video_length: usize) -> ClipWindow {
    let before = clip_length / 3;
    let after = 2 * clip_length / 3;
    let start = hit.saturating_sub(before).min(video_length);
    let end = hit.saturating_add(after).min(video_length);
    ClipWindow::new(start, end)
}

/// Candidate windows for every hit, in ascending hit order.
pub fn expand_all(
    hits: &HitIndexSet,
    clip_length: usize,
    video_length: usize,
) -> Result<Vec<ClipWindow>, PipelineError> {
    check_lengths(clip_length, video_length)?;
    Ok(hits
        .iter()
        .map(|hit| expand(hit, clip_length, video_length))
        .collect())
}

fn check_lengths(clip_length: usize, video_length: usize) -> Result<(), PipelineError> {
    if clip_length < MIN_CLIP_LENGTH {
        return Err(PipelineError::InvalidArgument(format!(
            "clip length must be at least {MIN_CLIP_LENGTH}, got {clip_length}"
        )));
    }
    if video_length == 0 {
        return Err(PipelineError::InvalidArgument(
            "video length must be greater than 0".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(20, 30, 100, 10, 40)]
    #[case(25, 30, 100, 15, 45)]
    #[case(70, 30, 100, 60, 90)]
    #[case(0, 30, 100, 0, 20)]
    #[case(99, 30, 100, 89, 100)]
    #[case(500, 1800, 10_000, 0, 1700)]
    fn test_expand(
        #[case] hit: usize,
        #[case] clip_length: usize,
        #[case] video_length: usize,
        #[case] start: usize,
        #[case] end: usize,
    ) {
        assert_eq!(
            expand(hit, clip_length, video_length),
            ClipWindow::new(start, end)
        );
    }

    #[test]
    fn test_window_trails_the_hit() {
        let w = expand(300, 30, 1000);
        assert_eq!(300 - w.start, 10);
        assert_eq!(w.end - 300, 20);
    }

    #[test]
    fn test_first_frame_never_goes_negative() {
        for hit in 0..10 {
            assert_eq!(expand(hit, 30, 100).start, 0);
        }
    }

    #[test]
    fn test_last_frame_never_exceeds_video_length() {
        let w = expand(99, 30, 100);
        assert_eq!(w.end, 100);
    }

    #[test]
    fn test_shortest_clip_length_spans_the_hit() {
        assert_eq!(expand(50, MIN_CLIP_LENGTH, 100), ClipWindow::new(49, 52));
        assert!(!expand(0, MIN_CLIP_LENGTH, 100).is_empty());
    }

    #[test]
    fn test_expand_all_in_hit_order() {
        let hits: HitIndexSet = [70, 20, 25].into_iter().collect();
        let windows = expand_all(&hits, 30, 100).unwrap();
        assert_eq!(
            windows,
            vec![
                ClipWindow::new(10, 40),
                ClipWindow::new(15, 45),
                ClipWindow::new(60, 90)
            ]
        );
    }

    #[rstest]
    #[case(0, 100)]
    #[case(1, 100)]
    #[case(2, 100)]
    #[case(30, 0)]
    fn test_expand_all_rejects_degenerate_lengths(
        #[case] clip_length: usize,
        #[case] video_length: usize,
    ) {
        let hits: HitIndexSet = [1].into_iter().collect();
        assert!(matches!(
            expand_all(&hits, clip_length, video_length),
            Err(PipelineError::InvalidArgument(_))
        ));
    }
}
