use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// One path that could not be removed after every retry.
#[derive(Debug)]
pub struct CleanupFailure {
    pub path: PathBuf,
    pub source: std::io::Error,
}

impl fmt::Display for CleanupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.source)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{} path(s) could not be removed", .failures.len())]
pub struct CleanupError {
    pub failures: Vec<CleanupFailure>,
}

/// Error type for the split pipeline and its HTTP surface.
#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    #[error("{0}")]
    Validation(String),

    #[error("upload exceeds the {0} byte limit")]
    PayloadTooLarge(usize),

    #[error("segmenter exited with {status}")]
    ProcessingFailed { status: String, stderr: String },

    #[error("segmenter did not finish within {0:?}")]
    ProcessingTimeout(Duration),

    #[error("segmenter produced no segments")]
    NoOutputProduced,

    #[error("packaging failed: {0}")]
    Packaging(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("cleanup failed: {0}")]
    Cleanup(#[from] CleanupError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SplitError {
    pub fn status(&self) -> StatusCode {
        match self {
            SplitError::Validation(_) => StatusCode::BAD_REQUEST,
            SplitError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            SplitError::ProcessingTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            SplitError::NotFound(_) => StatusCode::NOT_FOUND,
            SplitError::AccessDenied(_) => StatusCode::FORBIDDEN,
            SplitError::ProcessingFailed { .. }
            | SplitError::NoOutputProduced
            | SplitError::Packaging(_)
            | SplitError::Cleanup(_)
            | SplitError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client. Diagnostics stay in the log.
    pub fn public_message(&self) -> String {
        match self {
            SplitError::Validation(msg) => msg.clone(),
            SplitError::PayloadTooLarge(_) => "Uploaded file is too large".to_string(),
            SplitError::ProcessingFailed { .. } => "Error processing video".to_string(),
            SplitError::ProcessingTimeout(_) => "Video processing timed out".to_string(),
            SplitError::NoOutputProduced => "No video parts were created".to_string(),
            SplitError::Packaging(_) => "Error creating zip file".to_string(),
            SplitError::NotFound(_) => "File not found".to_string(),
            SplitError::AccessDenied(_) => "Access denied".to_string(),
            SplitError::Cleanup(_) => "Some files could not be cleared".to_string(),
            SplitError::Io(_) => "An unexpected error occurred".to_string(),
        }
    }
}

impl IntoResponse for SplitError {
    fn into_response(self) -> Response {
        match &self {
            SplitError::ProcessingFailed { status, stderr } => {
                tracing::error!("Segmenter failed ({}): {}", status, stderr);
            }
            SplitError::Validation(_) | SplitError::NotFound(_) => {
                tracing::debug!("{}", self);
            }
            SplitError::AccessDenied(_) | SplitError::PayloadTooLarge(_) => {
                tracing::warn!("{}", self);
            }
            SplitError::Cleanup(e) => {
                for failure in &e.failures {
                    tracing::error!("Cleanup failure: {}", failure);
                }
            }
            _ => tracing::error!("{}", self),
        }

        (self.status(), self.public_message()).into_response()
    }
}

pub type Result<T> = std::result::Result<T, SplitError>;
