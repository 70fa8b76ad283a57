//! Error types for pa-detect.

use std::time::Duration;

use pa_core::PaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error(transparent)]
    Core(#[from] PaError),

    /// The background worker did not answer before the deadline.  No partial
    /// result is returned.
    #[error("detection did not finish within {0:?}")]
    Timeout(Duration),

    #[error("worker error: {0}")]
    Worker(String),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type DetectResult<T> = Result<T, DetectError>;
