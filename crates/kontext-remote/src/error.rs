use kontext_training::TrainingError;
use thiserror::Error;

/// Errors returned by the remote collaborators.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connect, timeout, TLS).
    #[error("Request Error: {0}")]
    RequestError(String),

    /// The service answered with a non-success status.
    #[error("API Error ({status}): {message}")]
    Status {
        status: u16,
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("Decode Error: {0}")]
    DecodeError(String),

    /// A prediction reached a terminal state other than `succeeded`.
    #[error("Prediction {id} {status}{}", detail.as_ref().map(|d| format!(": {}", d)).unwrap_or_default())]
    PredictionFailed {
        id: String,
        status: String,
        detail: Option<String>,
    },

    #[error("Prediction {id} did not finish within {seconds}s")]
    PredictionTimeout { id: String, seconds: u64 },

    #[error("Image Error: {0}")]
    ImageError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::DecodeError(e.to_string())
        } else if e.is_timeout() {
            Self::RequestError(format!("request timed out: {e}"))
        } else {
            Self::RequestError(e.to_string())
        }
    }
}

impl From<image::ImageError> for ApiError {
    fn from(e: image::ImageError) -> Self {
        Self::ImageError(e.to_string())
    }
}

impl From<ApiError> for TrainingError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Status { status, message } => Self::Remote { status, message },
            ApiError::Io(io) => Self::Io(io),
            other => Self::Other(anyhow::Error::new(other)),
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
