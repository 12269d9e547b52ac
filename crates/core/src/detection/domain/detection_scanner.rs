//! Sampled identity scan over one batch of frames.

use crate::detection::domain::hit_index_set::HitIndexSet;
use crate::error::PipelineError;
use crate::recognition::domain::face_matcher::FaceMatcher;
use crate::recognition::domain::known_face_set::KnownFaceSet;
use crate::shared::frame::Frame;

/// Scans a batch of consecutive frames for known identities.
///
/// Stateless: every call receives the batch, its absolute start index, the
/// sampling interval and the read-only known set, so one scanner can serve
/// any number of batches or workers.
pub struct DetectionScanner<'a> {
    matcher: &'a dyn FaceMatcher,
}

impl<'a> DetectionScanner<'a> {
    pub fn new(matcher: &'a dyn FaceMatcher) -> Self {
        Self { matcher }
    }

    /// Returns the absolute indices of sampled frames in which any detected
    /// face matches any known encoding.
    ///
    /// `frames[offset]` is taken to be absolute frame `batch_start + offset`,
    /// and is sampled when that index is a multiple of `interval`.
    pub fn scan(
        &self,
        frames: &[Frame],
        batch_start: usize,
        interval: usize,
        known: &KnownFaceSet,
    ) -> Result<HitIndexSet, PipelineError> {
        if known.is_empty() {
            return Err(PipelineError::NoKnownFaces);
        }
        if interval == 0 {
            return Err(PipelineError::InvalidArgument(
                "frame interval must be greater than 0".into(),
            ));
        }

        let mut hits = HitIndexSet::new();
        for index in sampled_indices(batch_start, frames.len(), interval) {
            let frame = &frames[index - batch_start];
            let encodings = self.matcher.encode(frame).map_err(PipelineError::matcher)?;
            if encodings
                .iter()
                .any(|encoding| self.matcher.matches(known, encoding))
            {
                log::debug!("Known face matched at frame {index}");
                hits.insert(index);
            }
        }
        Ok(hits)
    }
}

/// Absolute indices in `[batch_start, batch_start + len)` divisible by
/// `interval`. `interval` must be non-zero.
pub fn sampled_indices(
    batch_start: usize,
    len: usize,
    interval: usize,
) -> impl Iterator<Item = usize> {
    let first = batch_start.next_multiple_of(interval);
    (first..batch_start + len).step_by(interval)
}
