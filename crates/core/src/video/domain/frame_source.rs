use std::path::Path;

use crate::error::BoxError;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Frames decoded for one batch request.
#[derive(Clone, Debug, Default)]
pub struct FrameBatch {
    /// Absolute index of `frames[0]`.
    pub start: usize,
    /// Decoded RGB24 frames, consecutive from `start`.
    pub frames: Vec<Frame>,
    /// Frames expected in `[start, min(start + size, total))` that the
    /// decoder did not deliver.
    pub lost_frames: usize,
}

impl FrameBatch {
    /// Builds a batch from the frames obtained for the request
    /// `(start, size, total_frames)`, counting the shortfall as lost.
    pub fn new(start: usize, frames: Vec<Frame>, size: usize, total_frames: usize) -> Self {
        let expected = expected_batch_len(start, size, total_frames);
        let lost_frames = expected.saturating_sub(frames.len());
        Self {
            start,
            frames,
            lost_frames,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Number of frames a request for `size` frames at `start` should yield.
pub fn expected_batch_len(start: usize, size: usize, total_frames: usize) -> usize {
    size.min(total_frames.saturating_sub(start))
}

/// Supplies decoded frames of a video in bounded batches.
///
/// Stateless across calls: every request names its video, start and size,
/// so independent batches can be read concurrently.
pub trait BatchFrameSource: Send + Sync {
    /// Opens the video and reports its metadata.
    fn probe(&self, path: &Path) -> Result<VideoMetadata, BoxError>;

    /// Seeks to `start` and decodes at most `size` frames, stopping early at
    /// `total_frames`. A decode failure truncates the batch; the shortfall is
    /// reported in [`FrameBatch::lost_frames`] rather than as an error.
    fn next_batch(
        &self,
        path: &Path,
        start: usize,
        size: usize,
        total_frames: usize,
    ) -> Result<FrameBatch, BoxError>;
}
