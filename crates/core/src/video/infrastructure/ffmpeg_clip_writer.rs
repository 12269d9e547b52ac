use std::fs;
use std::path::Path;

use crate::error::BoxError;
use crate::video::domain::clip_writer::ClipWriter;

use super::ffmpeg_input::VideoInput;
use super::ffmpeg_writer::{FfmpegWriter, DEFAULT_CRF};

/// Cuts clips by decoding the requested range and re-encoding it with
/// [`FfmpegWriter`]. Audio of the same range is copied into the clip when
/// the source has an audio stream.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegClipWriter {
    crf: Option<u32>,
}

impl FfmpegClipWriter {
    pub fn new() -> Self {
        Self { crf: None }
    }

    pub fn with_crf(crf: Option<u32>) -> Self {
        Self { crf }
    }

    pub fn crf(&self) -> u32 {
        self.crf.unwrap_or(DEFAULT_CRF)
    }

    fn encode_video(
        &self,
        source: &Path,
        output: &Path,
        start_secs: f64,
        end_secs: f64,
    ) -> Result<usize, BoxError> {
        let mut input = VideoInput::open(source)?;
        let meta = input.metadata().clone();
        let half_frame = if meta.fps > 0.0 { 0.5 / meta.fps } else { 0.0 };
        input.seek_to_seconds(start_secs)?;

        let mut writer = FfmpegWriter::new().with_crf(self.crf());
        writer.open(output, meta.width, meta.height, meta.fps)?;

        let mut position = 0.0;
        while let Some(picture) = input.next_picture() {
            let picture = picture?;
            let seconds = picture.seconds.unwrap_or(position);
            position = seconds + 2.0 * half_frame;
            if seconds + half_frame < start_secs {
                continue;
            }
            if seconds + half_frame >= end_secs {
                break;
            }
            let index = input.frame_index_at(seconds);
            writer.write(&input.into_frame(picture, index))?;
        }
        writer.finish()
    }
}

impl ClipWriter for FfmpegClipWriter {
    fn write_subclip(
        &self,
        source: &Path,
        output: &Path,
        start_secs: f64,
        end_secs: f64,
    ) -> Result<(), BoxError> {
        if end_secs <= start_secs {
            return Err(format!("empty clip range {start_secs:.3}s..{end_secs:.3}s").into());
        }

        let written = match self.encode_video(source, output, start_secs, end_secs) {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(output);
                return Err(e);
            }
        };
        if written == 0 {
            let _ = fs::remove_file(output);
            return Err(format!(
                "no frames between {start_secs:.3}s and {end_secs:.3}s in {}",
                source.display()
            )
            .into());
        }
        log::debug!("Encoded {written} frames into {}", output.display());

        if let Err(e) = mux_audio_range(source, output, start_secs, end_secs) {
            log::warn!("Audio muxing failed for {}: {e}", output.display());
        }
        Ok(())
    }
}

/// Copies the audio packets of `[start_secs, end_secs)` from `source` into
/// the video-only `clip`, shifted so the range starts at zero.
///
/// Does nothing when the source has no audio stream.
fn mux_audio_range(
    source: &Path,
    clip: &Path,
    start_secs: f64,
    end_secs: f64,
) -> Result<(), BoxError> {
    let mut ictx_source = ffmpeg_next::format::input(source)?;
    let Some(audio_index) = ictx_source
        .streams()
        .best(ffmpeg_next::media::Type::Audio)
        .map(|s| s.index())
    else {
        return Ok(());
    };
    let mut ictx_clip = ffmpeg_next::format::input(clip)?;

    replace_via_temp(clip, |temp_path| {
        copy_with_audio(
            &mut ictx_clip,
            &mut ictx_source,
            audio_index,
            temp_path,
            start_secs,
            end_secs,
        )
    })
}

/// Runs `write` against a sibling temp file and renames the result over
/// `target`. The temp file is removed when `write` or the rename fails.
fn replace_via_temp<F>(target: &Path, write: F) -> Result<(), BoxError>
where
    F: FnOnce(&Path) -> Result<(), BoxError>,
{
    let ext = target.extension().and_then(|e| e.to_str()).unwrap_or("mp4");
    let temp_path = target.with_extension(format!("mux.{ext}"));
    let result = write(&temp_path).and_then(|()| Ok(fs::rename(&temp_path, target)?));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn copy_with_audio(
    ictx_clip: &mut ffmpeg_next::format::context::Input,
    ictx_source: &mut ffmpeg_next::format::context::Input,
    audio_index: usize,
    temp_path: &Path,
    start_secs: f64,
    end_secs: f64,
) -> Result<(), BoxError> {
    let mut octx = ffmpeg_next::format::output(temp_path)?;

    let clip_video = ictx_clip
        .streams()
        .best(ffmpeg_next::media::Type::Video)
        .ok_or("clip has no video stream")?;
    let clip_video_index = clip_video.index();
    let clip_time_base = clip_video.time_base();
    let mut ost = octx.add_stream(ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::None))?;
    ost.set_parameters(clip_video.parameters());
    // SAFETY: the parameters pointer belongs to the stream just added to
    // `octx` and is valid for the duration of this write.
    unsafe {
        (*ost.parameters().as_mut_ptr()).codec_tag = 0;
    }

    let audio_stream = ictx_source
        .stream(audio_index)
        .ok_or("audio stream disappeared")?;
    let audio_time_base = audio_stream.time_base();
    let mut ost = octx.add_stream(ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::None))?;
    ost.set_parameters(audio_stream.parameters());
    // SAFETY: as above.
    unsafe {
        (*ost.parameters().as_mut_ptr()).codec_tag = 0;
    }

    octx.write_header()?;

    for (stream, mut packet) in ictx_clip.packets() {
        if stream.index() != clip_video_index {
            continue;
        }
        let ost_time_base = octx.stream(0).ok_or("missing output stream")?.time_base();
        packet.rescale_ts(clip_time_base, ost_time_base);
        packet.set_position(-1);
        packet.set_stream(0);
        packet.write_interleaved(&mut octx)?;
    }

    let offset = seconds_to_pts(start_secs, audio_time_base);
    let end = seconds_to_pts(end_secs, audio_time_base);
    let ost_time_base = octx.stream(1).ok_or("missing output stream")?.time_base();
    for (stream, mut packet) in ictx_source.packets() {
        if stream.index() != audio_index {
            continue;
        }
        let Some(pts) = packet.pts() else { continue };
        if pts < offset {
            continue;
        }
        if pts >= end {
            break;
        }
        packet.set_pts(Some(pts - offset));
        packet.set_dts(packet.dts().map(|dts| dts - offset));
        packet.rescale_ts(audio_time_base, ost_time_base);
        packet.set_position(-1);
        packet.set_stream(1);
        packet.write_interleaved(&mut octx)?;
    }

    octx.write_trailer()?;
    Ok(())
}

fn seconds_to_pts(seconds: f64, time_base: ffmpeg_next::Rational) -> i64 {
    if time_base.numerator() == 0 {
        return 0;
    }
    (seconds * f64::from(time_base.denominator()) / f64::from(time_base.numerator())).round()
        as i64
}
