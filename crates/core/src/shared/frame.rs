use ndarray::ArrayView3;

/// A decoded video frame or reference image: packed RGB24 bytes, row-major.
///
/// RGB24 is the canonical colour layout handed to the face matcher. Pixel
/// format conversion happens in the video infrastructure only.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

pub const RGB_CHANNELS: usize = 3;

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * RGB_CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Absolute position of this frame in its source video (0 for images).
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> Option<ArrayView3<'_, u8>> {
        ArrayView3::from_shape(
            (self.height as usize, self.width as usize, RGB_CHANNELS),
            &self.data,
        )
        .ok()
    }

    /// Copies the pixels of `[x1, x2) x [y1, y2)` into a new frame.
    ///
    /// Coordinates are clamped to the frame; returns `None` when the clamped
    /// rectangle is empty.
    pub fn crop(&self, x1: i64, y1: i64, x2: i64, y2: i64) -> Option<Frame> {
        let w = i64::from(self.width);
        let h = i64::from(self.height);
        let x1 = x1.clamp(0, w) as usize;
        let x2 = x2.clamp(0, w) as usize;
        let y1 = y1.clamp(0, h) as usize;
        let y2 = y2.clamp(0, h) as usize;
        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        let row_len = self.width as usize * RGB_CHANNELS;
        let mut data = Vec::with_capacity((x2 - x1) * (y2 - y1) * RGB_CHANNELS);
        for row in y1..y2 {
            let start = row * row_len + x1 * RGB_CHANNELS;
            let end = row * row_len + x2 * RGB_CHANNELS;
            data.extend_from_slice(&self.data[start..end]);
        }
        Some(Frame::new(
            data,
            (x2 - x1) as u32,
            (y2 - y1) as u32,
            self.index,
        ))
    }
}
