//! Shared error type.
//!
//! Sub-crates either return `PaError` directly or wrap it as one variant of
//! their own enum (see `pa_detect::DetectError`).

use thiserror::Error;

/// The base error type for every `pa-*` crate.
#[derive(Debug, Error)]
pub enum PaError {
    /// The perimeter polygon is degenerate or carries malformed coordinates.
    /// Kept distinct from "no data", which is a normal empty result.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for all `pa-*` crates.
pub type PaResult<T> = Result<T, PaError>;
