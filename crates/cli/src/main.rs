mod logging;
mod settings;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use facetrail_core::pipeline::detect_faces_use_case::DetectFacesUseCase;
use facetrail_core::pipeline::extract_clips_use_case::{ClipOutcome, ExtractClipsUseCase};
use facetrail_core::pipeline::generate_encodings_use_case::GenerateEncodingsUseCase;
use facetrail_core::pipeline::infrastructure::threaded_scan_executor::ThreadedScanExecutor;
use facetrail_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use facetrail_core::pipeline::run_pipeline_use_case::{RunPipelineUseCase, RunRequest};
use facetrail_core::pipeline::scan_executor::{ScanExecutor, SequentialScanExecutor};
use facetrail_core::pipeline::scan_video_use_case::{ScanMode, ScanVideoUseCase};
use facetrail_core::pipeline::train_known_faces_use_case::TrainKnownFacesUseCase;
use facetrail_core::clipping::domain::window_expander::MIN_CLIP_LENGTH;
use facetrail_core::recognition::domain::face_matcher::FaceMatcher;
use facetrail_core::recognition::domain::training_source::TrainingSource;
use facetrail_core::recognition::infrastructure::encoding_store::{
    self, has_encodings_extension, EncodingStoreError,
};
use facetrail_core::recognition::infrastructure::onnx_face_matcher::OnnxFaceMatcher;
use facetrail_core::shared::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_CLIP_FRAME_INTERVAL, DEFAULT_CLIP_LENGTH,
    DEFAULT_DETECT_FRAME_INTERVAL,
};
use facetrail_core::shared::model_resolver::{
    self, ModelSpec, FACE_ENCODER_MODEL, FACE_LOCATOR_MODEL,
};
use facetrail_core::video::infrastructure::ffmpeg_clip_writer::FfmpegClipWriter;
use facetrail_core::video::infrastructure::ffmpeg_frame_source::FfmpegFrameSource;
use facetrail_core::video::infrastructure::image_file_reader::ImageFileReader;

use settings::Settings;

/// Find a known face in a video and cut the matching stretches into clips.
#[derive(Parser)]
#[command(name = "facetrail", version)]
struct Cli {
    /// Also write log lines to a timestamped file in this directory.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Only log warnings and errors.
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Settings file (defaults to the per-user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the sorted list of frames where the known face appears.
    DetectFaces {
        #[command(flatten)]
        training: TrainingArgs,

        /// Input video.
        #[arg(long)]
        video: PathBuf,

        /// Scan every Nth frame.
        #[arg(long, default_value_t = DEFAULT_DETECT_FRAME_INTERVAL)]
        frame_interval: usize,

        /// Text file receiving the hit frame list.
        #[arg(long)]
        output_path: PathBuf,
    },

    /// Scan the whole video at once and extract clips.
    Run {
        #[command(flatten)]
        clips: ClipArgs,
    },

    /// Scan the video in bounded batches and extract clips.
    Batch {
        #[command(flatten)]
        clips: ClipArgs,

        /// Maximum frames held in memory per batch.
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },

    /// Encode a directory of reference images into a reusable .fenc file.
    GenerateEncodings {
        /// Directory of reference images of the person to find.
        #[arg(long)]
        images_dir: PathBuf,

        /// Encodings file to write (must end in .fenc).
        #[arg(long)]
        output_path: PathBuf,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct TrainingArgs {
    /// Directory of reference images of the person to find.
    #[arg(long)]
    images_dir: Option<PathBuf>,

    /// Encodings file produced by `generate-encodings`.
    #[arg(long)]
    encodings_file: Option<PathBuf>,
}

#[derive(Args)]
struct ClipArgs {
    #[command(flatten)]
    training: TrainingArgs,

    /// Input video.
    #[arg(long)]
    video: PathBuf,

    /// Scan every Nth frame.
    #[arg(long, default_value_t = DEFAULT_CLIP_FRAME_INTERVAL)]
    frame_interval: usize,

    /// Frames spanned by one clip before merging.
    #[arg(long, default_value_t = DEFAULT_CLIP_LENGTH)]
    clips_length: usize,

    /// Existing directory receiving the clips.
    #[arg(long)]
    output_dir: PathBuf,
}

impl TrainingArgs {
    fn source(&self) -> Result<TrainingSource, String> {
        match (&self.images_dir, &self.encodings_file) {
            (Some(dir), None) => Ok(TrainingSource::FromImages(dir.clone())),
            (None, Some(file)) => Ok(TrainingSource::FromEncodingsFile(file.clone())),
            _ => Err("Exactly one of --images-dir or --encodings-file is required".into()),
        }
    }

    fn validate(&self) -> Result<(), String> {
        if let Some(dir) = &self.images_dir {
            require_dir(dir, "Images directory")?;
        }
        if let Some(file) = &self.encodings_file {
            if !file.is_file() {
                return Err(format!("Encodings file not found: {}", file.display()));
            }
            require_fenc(file)?;
        }
        self.source().map(|_| ())
    }
}

impl ClipArgs {
    fn validate(&self) -> Result<(), String> {
        self.training.validate()?;
        require_file(&self.video)?;
        require_positive(self.frame_interval, "Frame interval")?;
        if self.clips_length < MIN_CLIP_LENGTH {
            return Err(format!(
                "Clips length must be at least {MIN_CLIP_LENGTH}, got {}",
                self.clips_length
            ));
        }
        require_dir(&self.output_dir, "Output directory")
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.quiet, cli.log_dir.as_deref()) {
        eprintln!("Error: {e}");
        process::exit(1);
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    validate(&cli.command)?;
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Command::DetectFaces {
            training,
            video,
            frame_interval,
            output_path,
        } => {
            let training = load_training(training.source()?)?;
            run_detect_faces(&settings, training, &video, frame_interval, &output_path)
        }
        Command::Run { clips } => {
            let training = load_training(clips.training.source()?)?;
            run_clips(&settings, &clips, training, ScanMode::WholeVideo)
        }
        Command::Batch { clips, batch_size } => {
            let training = load_training(clips.training.source()?)?;
            run_clips(&settings, &clips, training, ScanMode::Batched { batch_size })
        }
        Command::GenerateEncodings {
            images_dir,
            output_path,
        } => run_generate_encodings(&settings, &images_dir, &output_path),
    }
}

/// Decodes an encodings file before any model is resolved.
fn load_training(source: TrainingSource) -> Result<TrainingSource, EncodingStoreError> {
    match source {
        TrainingSource::FromEncodingsFile(path) => {
            Ok(TrainingSource::Pretrained(encoding_store::load(&path)?))
        }
        other => Ok(other),
    }
}

fn run_detect_faces(
    settings: &Settings,
    training: TrainingSource,
    video: &Path,
    interval: usize,
    output_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let matcher = build_matcher(settings)?;
    let use_case = DetectFacesUseCase::new(
        build_trainer(&matcher),
        build_scanner(&matcher, settings.workers),
    );

    let mut logger = StdoutPipelineLogger::new();
    let hits = use_case.execute(training, video, interval, output_path, &mut logger)?;
    log::info!(
        "Found the known face in {} sampled frames; written to {}",
        hits.len(),
        output_path.display()
    );
    Ok(())
}

fn run_clips(
    settings: &Settings,
    clips: &ClipArgs,
    training: TrainingSource,
    mode: ScanMode,
) -> Result<(), Box<dyn std::error::Error>> {
    let matcher = build_matcher(settings)?;
    let use_case = RunPipelineUseCase::new(
        build_trainer(&matcher),
        build_scanner(&matcher, settings.workers),
        ExtractClipsUseCase::new(Box::new(FfmpegClipWriter::with_crf(settings.quality))),
    );

    let request = RunRequest {
        training,
        video: &clips.video,
        interval: clips.frame_interval,
        mode,
        clip_length: clips.clips_length,
        output_dir: &clips.output_dir,
    };
    let mut logger = StdoutPipelineLogger::new();
    let report = use_case.execute(request, &mut logger)?;

    match report.outcome {
        ClipOutcome::NoMatches => {
            log::info!("The known face was not found; no clips written");
        }
        ClipOutcome::Extracted { report, .. } => {
            log::info!(
                "Wrote {} clips to {}",
                report.written.len(),
                clips.output_dir.display()
            );
        }
    }
    Ok(())
}

fn run_generate_encodings(
    settings: &Settings,
    images_dir: &Path,
    output_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let matcher = build_matcher(settings)?;
    GenerateEncodingsUseCase::new(build_trainer(&matcher)).execute(images_dir, output_path)?;
    Ok(())
}

fn build_matcher(settings: &Settings) -> Result<Arc<dyn FaceMatcher>, Box<dyn std::error::Error>> {
    let bundled = settings.models_dir.as_deref();
    let locator = resolve_model(FACE_LOCATOR_MODEL, bundled)?;
    let encoder = resolve_model(FACE_ENCODER_MODEL, bundled)?;

    let matcher = OnnxFaceMatcher::new(
        &locator,
        &encoder,
        settings.detection_confidence,
        settings.match_threshold,
    )?;
    Ok(Arc::new(matcher))
}

fn resolve_model(
    model: ModelSpec,
    bundled: Option<&Path>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {}", model.name);
    let name = model.name;
    let path = model_resolver::resolve(
        model,
        bundled,
        Some(Box::new(move |downloaded, total| {
            download_progress(name, downloaded, total)
        })),
    )?;
    Ok(path)
}

fn build_trainer(matcher: &Arc<dyn FaceMatcher>) -> TrainKnownFacesUseCase {
    TrainKnownFacesUseCase::new(Arc::clone(matcher), Box::new(ImageFileReader::new()))
}

fn build_scanner(matcher: &Arc<dyn FaceMatcher>, workers: usize) -> ScanVideoUseCase {
    ScanVideoUseCase::new(
        Arc::new(FfmpegFrameSource::new()),
        Arc::clone(matcher),
        build_executor(workers),
    )
}

fn build_executor(workers: usize) -> Box<dyn ScanExecutor> {
    if workers > 1 {
        Box::new(ThreadedScanExecutor::new(workers))
    } else {
        Box::new(SequentialScanExecutor)
    }
}

fn validate(command: &Command) -> Result<(), String> {
    match command {
        Command::DetectFaces {
            training,
            video,
            frame_interval,
            output_path,
        } => {
            training.validate()?;
            require_file(video)?;
            require_positive(*frame_interval, "Frame interval")?;
            match output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                Some(parent) => require_dir(parent, "Output directory"),
                None => Ok(()),
            }
        }
        Command::Run { clips } => clips.validate(),
        Command::Batch { clips, batch_size } => {
            clips.validate()?;
            require_positive(*batch_size, "Batch size")
        }
        Command::GenerateEncodings {
            images_dir,
            output_path,
        } => {
            require_dir(images_dir, "Images directory")?;
            require_fenc(output_path)
        }
    }
}

fn require_file(video: &Path) -> Result<(), String> {
    if video.is_file() {
        Ok(())
    } else {
        Err(format!("Video file not found: {}", video.display()))
    }
}

fn require_dir(dir: &Path, what: &str) -> Result<(), String> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(format!("{what} not found: {}", dir.display()))
    }
}

fn require_fenc(path: &Path) -> Result<(), String> {
    if has_encodings_extension(path) {
        Ok(())
    } else {
        Err(format!(
            "Encodings file must end in .fenc, got {}",
            path.display()
        ))
    }
}

fn require_positive(value: usize, what: &str) -> Result<(), String> {
    if value == 0 {
        Err(format!("{what} must be greater than 0"))
    } else {
        Ok(())
    }
}

fn download_progress(name: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {name}... {pct}%");
    } else {
        eprint!("\rDownloading {name}... {downloaded} bytes");
    }
    if total > 0 && downloaded >= total {
        eprintln!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facetrail_core::recognition::domain::encoding::Encoding;
    use facetrail_core::recognition::domain::known_face_set::KnownFaceSet;
    use std::fs;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("facetrail").chain(args.iter().copied()))
    }

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            fs::create_dir(dir.path().join("faces")).unwrap();
            fs::create_dir(dir.path().join("clips")).unwrap();
            fs::write(dir.path().join("video.mp4"), b"").unwrap();
            fs::write(dir.path().join("known.fenc"), b"").unwrap();
            Self { dir }
        }

        fn path(&self, name: &str) -> String {
            self.dir.path().join(name).to_string_lossy().into_owned()
        }
    }

    #[test]
    fn test_defaults_per_command() {
        let cli = parse(&[
            "run",
            "--images-dir",
            "faces",
            "--video",
            "v.mp4",
            "--output-dir",
            "out",
        ])
        .unwrap();
        let Command::Run { clips } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(clips.frame_interval, DEFAULT_CLIP_FRAME_INTERVAL);
        assert_eq!(clips.clips_length, DEFAULT_CLIP_LENGTH);

        let cli = parse(&[
            "detect-faces",
            "--encodings-file",
            "k.fenc",
            "--video",
            "v.mp4",
            "--output-path",
            "hits.txt",
        ])
        .unwrap();
        let Command::DetectFaces { frame_interval, .. } = cli.command else {
            panic!("expected detect-faces");
        };
        assert_eq!(frame_interval, DEFAULT_DETECT_FRAME_INTERVAL);

        let cli = parse(&[
            "batch",
            "--images-dir",
            "faces",
            "--video",
            "v.mp4",
            "--output-dir",
            "out",
        ])
        .unwrap();
        let Command::Batch { batch_size, .. } = cli.command else {
            panic!("expected batch");
        };
        assert_eq!(batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_training_sources_are_mutually_exclusive() {
        let both = parse(&[
            "run",
            "--images-dir",
            "faces",
            "--encodings-file",
            "k.fenc",
            "--video",
            "v.mp4",
            "--output-dir",
            "out",
        ]);
        assert!(both.is_err());

        let neither = parse(&["run", "--video", "v.mp4", "--output-dir", "out"]);
        assert!(neither.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&[
            "generate-encodings",
            "--images-dir",
            "faces",
            "--output-path",
            "k.fenc",
            "--quiet",
            "--log-dir",
            "logs",
        ])
        .unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.log_dir, Some(PathBuf::from("logs")));
    }

    #[test]
    fn test_validate_accepts_well_formed_batch() {
        let fx = Fixture::new();
        let cli = parse(&[
            "batch",
            "--encodings-file",
            &fx.path("known.fenc"),
            "--video",
            &fx.path("video.mp4"),
            "--output-dir",
            &fx.path("clips"),
        ])
        .unwrap();
        assert!(validate(&cli.command).is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_output_dir() {
        let fx = Fixture::new();
        let cli = parse(&[
            "run",
            "--images-dir",
            &fx.path("faces"),
            "--video",
            &fx.path("video.mp4"),
            "--output-dir",
            &fx.path("missing"),
        ])
        .unwrap();
        let err = validate(&cli.command).unwrap_err();
        assert!(err.starts_with("Output directory not found"));
    }

    #[test]
    fn test_validate_rejects_missing_images_dir() {
        let fx = Fixture::new();
        let cli = parse(&[
            "detect-faces",
            "--images-dir",
            &fx.path("nobody"),
            "--video",
            &fx.path("video.mp4"),
            "--output-path",
            &fx.path("hits.txt"),
        ])
        .unwrap();
        assert!(validate(&cli.command)
            .unwrap_err()
            .starts_with("Images directory not found"));
    }

    #[test]
    fn test_validate_rejects_wrong_encodings_extension() {
        let fx = Fixture::new();
        let cli = parse(&[
            "generate-encodings",
            "--images-dir",
            &fx.path("faces"),
            "--output-path",
            &fx.path("known.pkl"),
        ])
        .unwrap();
        assert!(validate(&cli.command).unwrap_err().contains(".fenc"));
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let fx = Fixture::new();
        let cli = parse(&[
            "batch",
            "--images-dir",
            &fx.path("faces"),
            "--video",
            &fx.path("video.mp4"),
            "--output-dir",
            &fx.path("clips"),
            "--batch-size",
            "0",
        ])
        .unwrap();
        assert_eq!(
            validate(&cli.command).unwrap_err(),
            "Batch size must be greater than 0"
        );

        let cli = parse(&[
            "run",
            "--images-dir",
            &fx.path("faces"),
            "--video",
            &fx.path("video.mp4"),
            "--output-dir",
            &fx.path("clips"),
            "--frame-interval",
            "0",
        ])
        .unwrap();
        assert_eq!(
            validate(&cli.command).unwrap_err(),
            "Frame interval must be greater than 0"
        );
    }

    #[test]
    fn test_validate_rejects_clips_shorter_than_three_frames() {
        let fx = Fixture::new();
        let clips_length = |value: &str| {
            parse(&[
                "run",
                "--images-dir",
                &fx.path("faces"),
                "--video",
                &fx.path("video.mp4"),
                "--output-dir",
                &fx.path("clips"),
                "--clips-length",
                value,
            ])
            .unwrap()
        };

        assert_eq!(
            validate(&clips_length("1").command).unwrap_err(),
            "Clips length must be at least 3, got 1"
        );
        assert!(validate(&clips_length("3").command).is_ok());
    }

    #[test]
    fn test_empty_encodings_file_fails_before_models_are_resolved() {
        let fx = Fixture::new();
        let settings_path = fx.dir.path().join("settings.json");
        fs::write(&settings_path, "{}").unwrap();
        let cli = parse(&[
            "run",
            "--encodings-file",
            &fx.path("known.fenc"),
            "--video",
            &fx.path("video.mp4"),
            "--output-dir",
            &fx.path("clips"),
            "--config",
            &settings_path.to_string_lossy(),
        ])
        .unwrap();

        let err = run(cli).unwrap_err();
        assert!(
            err.downcast_ref::<EncodingStoreError>().is_some(),
            "expected an encodings error, got: {err}"
        );
    }

    #[test]
    fn test_encodings_file_is_loaded_as_pretrained() {
        let fx = Fixture::new();
        let path = fx.dir.path().join("saved.fenc");
        let known = KnownFaceSet::from_encodings(vec![Encoding::new(vec![0.6, 0.8])]);
        encoding_store::save(&known, &path).unwrap();

        let loaded = load_training(TrainingSource::FromEncodingsFile(path)).unwrap();
        assert!(matches!(loaded, TrainingSource::Pretrained(set) if set.len() == 1));

        let empty = load_training(TrainingSource::FromEncodingsFile(
            fx.dir.path().join("known.fenc"),
        ));
        assert!(matches!(
            empty,
            Err(EncodingStoreError::NotAnEncodingsFile { .. })
        ));
    }

    #[test]
    fn test_training_source_from_args() {
        let args = TrainingArgs {
            images_dir: None,
            encodings_file: Some(PathBuf::from("k.fenc")),
        };
        assert!(matches!(
            args.source(),
            Ok(TrainingSource::FromEncodingsFile(path)) if path == Path::new("k.fenc")
        ));
    }
}
