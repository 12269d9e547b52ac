/// Half-open frame range `[start, end)` to be cut out as one clip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClipWindow {
    pub start: usize,
    pub end: usize,
}

impl ClipWindow {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "window start must not exceed its end");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Touching windows count as overlapping.
    pub fn overlaps(&self, other: &ClipWindow) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}
