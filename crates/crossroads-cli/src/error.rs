//! Crossroads CLI error types.

use crossroads_core::error::AdventureError;
use thiserror::Error;

/// Errors surfaced by the `crossroads` binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// An environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// An adventure operation failed.
    #[error(transparent)]
    Domain(#[from] AdventureError),

    /// Reading input or writing output failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A view could not be rendered as JSON.
    #[error("output error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Process exit code for this error: `2` for bad input or a missing
    /// adventure or node, `1` otherwise.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Domain(AdventureError::Validation(_)) => 2,
            Self::Domain(error) if error.is_not_found() => 2,
            Self::Domain(_) | Self::Io(_) | Self::Json(_) => 1,
        }
    }
}
