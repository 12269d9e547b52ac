use std::path::Path;

use crate::error::BoxError;
use crate::shared::frame::{Frame, RGB_CHANNELS};

/// CRF used when no quality is configured.
pub const DEFAULT_CRF: u32 = 18;

/// Highest accepted CRF value (worst quality).
pub const MAX_CRF: u32 = 51;

/// Lambda per quantiser step (libavcodec `FF_QP2LAMBDA`).
const QP2LAMBDA: i32 = 118;

/// Encodes RGB24 frames to an MPEG-4 part 2 video via ffmpeg-next.
///
/// Quality is given on the familiar 0 (best) to 51 (worst) CRF scale and
/// mapped onto MPEG-4's fixed quantiser range.
pub struct FfmpegWriter {
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    width: u32,
    height: u32,
    frame_rate: ffmpeg_next::Rational,
    frame_count: usize,
    crf: u32,
}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            octx: None,
            encoder: None,
            scaler: None,
            width: 0,
            height: 0,
            frame_rate: ffmpeg_next::Rational(30, 1),
            frame_count: 0,
            crf: DEFAULT_CRF,
        }
    }

    pub fn with_crf(mut self, crf: u32) -> Self {
        self.crf = crf.min(MAX_CRF);
        self
    }

    pub fn crf(&self) -> u32 {
        self.crf
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn open(&mut self, path: &Path, width: u32, height: u32, fps: f64) -> Result<(), BoxError> {
        ffmpeg_next::init()?;

        let fps_i = match fps.round() as i32 {
            n if n <= 0 => 30,
            n => n,
        };
        let mut octx = ffmpeg_next::format::output(path)?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or("MPEG4 encoder not found")?;
        let mut ost = octx.add_stream(Some(codec))?;
        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        encoder_ctx.set_width(width);
        encoder_ctx.set_height(height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, fps_i));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps_i, 1)));

        let mut flags = ffmpeg_next::codec::Flags::empty();
        if global_header {
            flags |= ffmpeg_next::codec::Flags::GLOBAL_HEADER;
        }
        flags |= ffmpeg_next::codec::Flags::QSCALE;
        encoder_ctx.set_flags(flags);
        encoder_ctx.set_global_quality(crf_to_qscale(self.crf) * QP2LAMBDA);

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);
        octx.write_header()?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::format::Pixel::YUV420P,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        self.width = width;
        self.height = height;
        self.frame_rate = ffmpeg_next::Rational(fps_i, 1);
        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = Some(scaler);
        self.frame_count = 0;
        Ok(())
    }

    pub fn write(&mut self, frame: &Frame) -> Result<(), BoxError> {
        let (Some(encoder), Some(scaler), Some(octx)) =
            (self.encoder.as_mut(), self.scaler.as_mut(), self.octx.as_mut())
        else {
            return Err("FfmpegWriter: not opened".into());
        };
        if frame.width() != self.width || frame.height() != self.height {
            return Err(format!(
                "frame is {}x{}, writer expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )
            .into());
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            self.width,
            self.height,
        );
        let stride = rgb_frame.stride(0);
        let row_len = self.width as usize * RGB_CHANNELS;
        let dst = rgb_frame.data_mut(0);
        for (row, src_row) in frame.data().chunks_exact(row_len).enumerate() {
            dst[row * stride..row * stride + row_len].copy_from_slice(src_row);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&rgb_frame, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(self.frame_count as i64));
        encoder.send_frame(&yuv_frame)?;
        drain_packets(encoder, octx, self.frame_rate)?;

        self.frame_count += 1;
        Ok(())
    }

    /// Flushes the encoder and writes the trailer. Returns the number of
    /// frames written. Calling it on a closed writer is a no-op.
    pub fn finish(&mut self) -> Result<usize, BoxError> {
        if let (Some(mut encoder), Some(mut octx)) = (self.encoder.take(), self.octx.take()) {
            encoder.send_eof()?;
            drain_packets(&mut encoder, &mut octx, self.frame_rate)?;
            octx.write_trailer()?;
        }
        self.scaler = None;
        Ok(self.frame_count)
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn drain_packets(
    encoder: &mut ffmpeg_next::codec::encoder::video::Encoder,
    octx: &mut ffmpeg_next::format::context::Output,
    frame_rate: ffmpeg_next::Rational,
) -> Result<(), BoxError> {
    let ost_time_base = octx.stream(0).ok_or("output has no video stream")?.time_base();
    let mut encoded = ffmpeg_next::Packet::empty();
    while encoder.receive_packet(&mut encoded).is_ok() {
        encoded.set_stream(0);
        encoded.rescale_ts(frame_rate.invert(), ost_time_base);
        encoded.write_interleaved(octx)?;
    }
    Ok(())
}

/// Maps CRF 0..=51 onto the MPEG-4 quantiser range 1..=31.
pub fn crf_to_qscale(crf: u32) -> i32 {
    1 + (crf.min(MAX_CRF) * 30 / MAX_CRF) as i32
}
