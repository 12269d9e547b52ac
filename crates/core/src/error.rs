use std::path::PathBuf;

use thiserror::Error;

use crate::recognition::infrastructure::encoding_store::EncodingStoreError;

/// Error type at the collaborator ports (matcher, codec, image decoding).
///
/// `Send + Sync` so results can cross worker threads.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Fatal pipeline failures.
///
/// Degradable conditions (a lost frame, a clip that failed to encode) are
/// not represented here; they are recorded in
/// [`RunSummary`](crate::pipeline::run_summary::RunSummary).
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no known face encodings were provided")]
    NoKnownFaces,

    #[error("no frame indices to merge: the hit set is empty")]
    EmptyHitSet,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Encodings(#[from] EncodingStoreError),

    #[error("video error: {0}")]
    Video(String),

    #[error("face matcher error: {0}")]
    Matcher(String),

    #[error("scan worker failed: {0}")]
    Worker(String),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn video(err: BoxError) -> Self {
        Self::Video(err.to_string())
    }

    pub fn matcher(err: BoxError) -> Self {
        Self::Matcher(err.to_string())
    }
}
