//! Synthetic MPEG-4 fixtures for the ffmpeg-backed tests.

use std::path::Path;

/// Brightness of every pixel in frame `index` of a [`create_test_video`]
/// fixture.
pub(crate) fn frame_value(index: usize) -> u8 {
    ((index * 20) % 256) as u8
}

/// Writes a silent MPEG-4 video whose frame `i` is a flat grey of
/// [`frame_value`]`(i)`.
pub(crate) fn create_test_video(path: &Path, num_frames: usize, width: u32, height: u32, fps: f64) {
    let indices: Vec<usize> = (0..num_frames).collect();
    create_test_video_with_frames(path, &indices, width, height, fps);
}

/// Like [`create_test_video`], but only the listed frame positions are
/// encoded, leaving timestamp gaps where positions are missing.
pub(crate) fn create_test_video_with_frames(
    path: &Path,
    indices: &[usize],
    width: u32,
    height: u32,
    fps: f64,
) {
    ffmpeg_next::init().unwrap();

    let mut octx = ffmpeg_next::format::output(path).unwrap();
    let global_header = octx
        .format()
        .flags()
        .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

    let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
    let mut ost = octx.add_stream(Some(codec)).unwrap();
    let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
        .encoder()
        .video()
        .unwrap();

    let rate = fps as i32;
    encoder_ctx.set_width(width);
    encoder_ctx.set_height(height);
    encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
    encoder_ctx.set_time_base(ffmpeg_next::Rational(1, rate));
    encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(rate, 1)));
    encoder_ctx.set_gop(4);
    if global_header {
        encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
    }

    let mut encoder = encoder_ctx
        .open_with(ffmpeg_next::Dictionary::new())
        .unwrap();
    ost.set_parameters(&encoder);
    octx.write_header().unwrap();
    let ost_time_base = octx.stream(0).unwrap().time_base();

    let mut scaler = ffmpeg_next::software::scaling::Context::get(
        ffmpeg_next::format::Pixel::RGB24,
        width,
        height,
        ffmpeg_next::format::Pixel::YUV420P,
        width,
        height,
        ffmpeg_next::software::scaling::Flags::BILINEAR,
    )
    .unwrap();

    let drain = |encoder: &mut ffmpeg_next::codec::encoder::video::Encoder,
                 octx: &mut ffmpeg_next::format::context::Output| {
        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(ffmpeg_next::Rational(1, rate), ost_time_base);
            encoded.write_interleaved(octx).unwrap();
        }
    };

    for &i in indices {
        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
        );
        let stride = rgb_frame.stride(0);
        let value = frame_value(i);
        let data = rgb_frame.data_mut(0);
        for row in 0..height as usize {
            data[row * stride..row * stride + width as usize * 3].fill(value);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&rgb_frame, &mut yuv_frame).unwrap();
        yuv_frame.set_pts(Some(i as i64));
        encoder.send_frame(&yuv_frame).unwrap();
        drain(&mut encoder, &mut octx);
    }

    encoder.send_eof().unwrap();
    drain(&mut encoder, &mut octx);
    octx.write_trailer().unwrap();
}

/// Mean channel value of a decoded frame.
pub(crate) fn mean_value(data: &[u8]) -> f64 {
    data.iter().map(|&b| f64::from(b)).sum::<f64>() / data.len().max(1) as f64
}
