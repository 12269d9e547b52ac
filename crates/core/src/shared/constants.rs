pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Extension of a persisted known-face encoding collection.
pub const ENCODINGS_EXTENSION: &str = "fenc";

/// Container used for extracted clips.
pub const CLIP_EXTENSION: &str = "mp4";

pub const DEFAULT_DETECT_FRAME_INTERVAL: usize = 10;
pub const DEFAULT_CLIP_FRAME_INTERVAL: usize = 15;
pub const DEFAULT_BATCH_SIZE: usize = 2000;
/// Clip length in frames (one minute at 30 fps).
pub const DEFAULT_CLIP_LENGTH: usize = 1800;
