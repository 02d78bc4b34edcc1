use std::path::PathBuf;
use thiserror::Error;

pub type TrainingResult<T> = std::result::Result<T, TrainingError>;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("source directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("insufficient valid images for training: found {found}, minimum {required} required")]
    InsufficientData { found: usize, required: usize },

    #[error("packaging error: {0}")]
    Packaging(String),

    #[error("submission error: {0}")]
    Submission(String),

    #[error("remote API error (status {status}): {message}")]
    Remote { status: u16, message: String },

    #[error("training {job_id} ended as {status}")]
    TrainingFailed { job_id: String, status: String },

    #[error("training {job_id} did not finish within {seconds}s")]
    Timeout { job_id: String, seconds: u64 },

    #[error("verification error: {0}")]
    Verification(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TrainingError {
    /// Wrap any submission-stage failure, keeping the remote status when there is one.
    #[must_use]
    pub fn submission(err: impl Into<Self>) -> Self {
        match err.into() {
            e @ (Self::Submission(_) | Self::Remote { .. }) => e,
            other => Self::Submission(other.to_string()),
        }
    }
}
