/// Position and width of one batch request.
///
/// Advances by `size` until `start` reaches the total frame count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchCursor {
    pub start: usize,
    pub size: usize,
}

impl BatchCursor {
    /// First cursor of a batched scan. `size` is at least 1.
    pub fn first(size: usize) -> Self {
        Self {
            start: 0,
            size: size.max(1),
        }
    }

    /// The single cursor covering a whole video.
    pub fn whole_video(total_frames: usize) -> Self {
        Self::first(total_frames)
    }

    pub fn advance(self) -> Self {
        Self {
            start: self.start + self.size,
            size: self.size,
        }
    }

    pub fn is_done(&self, total_frames: usize) -> bool {
        self.start >= total_frames
    }

    /// Frames this cursor covers in a video of `total_frames`.
    pub fn end(&self, total_frames: usize) -> usize {
        (self.start + self.size).min(total_frames)
    }

    /// Every cursor, in order, from `self` to the end of the video.
    pub fn steps(self, total_frames: usize) -> impl Iterator<Item = BatchCursor> {
        std::iter::successors(Some(self), |c| Some(c.advance()))
            .take_while(move |c| !c.is_done(total_frames))
    }
}
