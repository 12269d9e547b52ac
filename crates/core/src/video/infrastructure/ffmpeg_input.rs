//! Shared decode loop for the ffmpeg-backed video collaborators.

use std::path::Path;

use ffmpeg_next::util::error::EAGAIN;

use crate::error::BoxError;
use crate::shared::frame::{Frame, RGB_CHANNELS};
use crate::shared::video_metadata::VideoMetadata;

/// Microseconds per second, the unit of container-level seeks.
const AV_TIME_BASE: f64 = 1_000_000.0;

/// One decoded picture, already converted to packed RGB24.
pub(crate) struct DecodedPicture {
    /// Presentation time relative to the stream start, when known.
    pub seconds: Option<f64>,
    pub pixels: Vec<u8>,
}

/// An opened video stream with a decoder and an RGB24 scaler.
pub(crate) struct VideoInput {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    time_base: ffmpeg_next::Rational,
    start_pts: i64,
    metadata: VideoMetadata,
    eof: bool,
}

impl VideoInput {
    pub fn open(path: &Path) -> Result<Self, BoxError> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(path)?;
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let stream_index = stream.index();
        let time_base = stream.time_base();
        // AV_NOPTS_VALUE when the container does not record a start time.
        let start_pts = match stream.start_time() {
            i64::MIN => 0,
            ts => ts,
        };
        let codec_ctx =
            ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            f64::from(rate.numerator()) / f64::from(rate.denominator())
        } else {
            0.0
        };
        let header_frames = usize::try_from(stream.frames()).unwrap_or(0);
        let total_frames = if header_frames > 0 {
            header_frames
        } else {
            estimate_frame_count(ictx.duration(), fps)
        };

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            total_frames,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(path.to_path_buf()),
        };

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            metadata.width,
            metadata.height,
            ffmpeg_next::format::Pixel::RGB24,
            metadata.width,
            metadata.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        Ok(Self {
            ictx,
            decoder,
            scaler,
            stream_index,
            time_base,
            start_pts,
            metadata,
            eof: false,
        })
    }

    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Seeks to the keyframe at or before `seconds`. Frames decoded after a
    /// seek may therefore precede the requested position.
    pub fn seek_to_seconds(&mut self, seconds: f64) -> Result<(), BoxError> {
        if seconds <= 0.0 {
            return Ok(());
        }
        let ts = (seconds * AV_TIME_BASE) as i64;
        self.ictx.seek(ts, ..ts)?;
        self.decoder.flush();
        self.eof = false;
        Ok(())
    }

    /// Nearest frame index for a presentation time.
    pub fn frame_index_at(&self, seconds: f64) -> usize {
        (seconds.max(0.0) * self.metadata.fps).round() as usize
    }

    pub fn into_frame(&self, picture: DecodedPicture, index: usize) -> Frame {
        Frame::new(
            picture.pixels,
            self.metadata.width,
            self.metadata.height,
            index,
        )
    }

    /// Decodes the next picture. `None` once the stream is drained.
    pub fn next_picture(&mut self) -> Option<Result<DecodedPicture, BoxError>> {
        loop {
            if let Some(result) = self.try_receive() {
                return Some(result);
            }
            if self.eof {
                return None;
            }

            let packet = self
                .ictx
                .packets()
                .next()
                .map(|(stream, packet)| (stream.index(), packet));
            match packet {
                Some((index, packet)) if index == self.stream_index => {
                    if let Err(e) = self.decoder.send_packet(&packet) {
                        return Some(Err(e.into()));
                    }
                }
                Some(_) => continue,
                None => {
                    let _ = self.decoder.send_eof();
                    self.eof = true;
                }
            }
        }
    }

    fn try_receive(&mut self) -> Option<Result<DecodedPicture, BoxError>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        match self.decoder.receive_frame(&mut decoded) {
            Ok(()) => {}
            // The decoder needs more input, or is fully drained.
            Err(ffmpeg_next::Error::Eof) => return None,
            Err(ffmpeg_next::Error::Other { errno }) if errno == EAGAIN => return None,
            Err(e) => return Some(Err(e.into())),
        }

        let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb) {
            return Some(Err(e.into()));
        }
        let seconds = decoded
            .timestamp()
            .or_else(|| decoded.pts())
            .map(|pts| self.pts_to_seconds(pts));
        Some(Ok(DecodedPicture {
            seconds,
            pixels: extract_rgb_pixels(&rgb, self.metadata.width, self.metadata.height),
        }))
    }

    fn pts_to_seconds(&self, pts: i64) -> f64 {
        let tb = self.time_base;
        if tb.denominator() == 0 {
            return 0.0;
        }
        (pts - self.start_pts) as f64 * f64::from(tb.numerator()) / f64::from(tb.denominator())
    }
}

/// Frame count from container duration (microseconds) when the stream
/// header does not carry one.
pub(crate) fn estimate_frame_count(duration_us: i64, fps: f64) -> usize {
    if duration_us <= 0 || fps <= 0.0 {
        return 0;
    }
    (duration_us as f64 / AV_TIME_BASE * fps) as usize
}

/// Copies an RGB24 plane into a tightly packed buffer, dropping the row
/// padding ffmpeg may add (stride > width * 3).
pub(crate) fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_len = width as usize * RGB_CHANNELS;

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + row_len]);
    }
    pixels
}
