use std::path::Path;

use crate::error::BoxError;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_source::{expected_batch_len, BatchFrameSource, FrameBatch};

use super::ffmpeg_input::VideoInput;

/// Reads bounded batches of RGB24 frames via ffmpeg-next.
///
/// Every call opens the file afresh and seeks to the keyframe at or before
/// the batch start, so no decoder state survives between batches and one
/// instance can serve concurrent workers.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegFrameSource;

impl FfmpegFrameSource {
    pub fn new() -> Self {
        Self
    }
}

impl BatchFrameSource for FfmpegFrameSource {
    fn probe(&self, path: &Path) -> Result<VideoMetadata, BoxError> {
        let input = VideoInput::open(path)?;
        let metadata = input.metadata().clone();
        log::debug!(
            "Probed {}: {}x{} @ {:.2} fps, {} frames ({})",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.total_frames,
            metadata.codec
        );
        Ok(metadata)
    }

    fn next_batch(
        &self,
        path: &Path,
        start: usize,
        size: usize,
        total_frames: usize,
    ) -> Result<FrameBatch, BoxError> {
        let expected = expected_batch_len(start, size, total_frames);
        if expected == 0 {
            return Ok(FrameBatch::new(start, Vec::new(), size, total_frames));
        }

        let mut input = VideoInput::open(path)?;
        let fps = input.metadata().fps;
        if start > 0 && fps > 0.0 {
            input.seek_to_seconds(start as f64 / fps)?;
        }

        let mut frames = Vec::with_capacity(expected);
        let mut next_index = start;
        while frames.len() < expected {
            let wanted = start + frames.len();
            let picture = match input.next_picture() {
                Some(Ok(picture)) => picture,
                Some(Err(e)) => {
                    log::debug!("Decode failed at frame {wanted}: {e}");
                    break;
                }
                None => break,
            };

            // Pictures without a timestamp continue the running count.
            let index = picture
                .seconds
                .map(|s| input.frame_index_at(s))
                .unwrap_or(next_index);
            next_index = index + 1;
            if index < wanted {
                continue;
            }
            if index > wanted {
                log::debug!("Frames {wanted}..{index} missing from the stream");
                break;
            }
            frames.push(input.into_frame(picture, index));
        }

        Ok(FrameBatch::new(start, frames, size, total_frames))
    }
}
