pub mod ffmpeg_clip_writer;
pub mod ffmpeg_frame_source;
pub(crate) mod ffmpeg_input;
pub mod ffmpeg_writer;
pub mod image_file_reader;

#[cfg(test)]
pub(crate) mod test_video;
