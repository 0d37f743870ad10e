//! Error types for servicedata.
//!
//! Library crates use [`ServiceDataError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! A missing source CSV is deliberately *not* an error: it is reported as
//! [`crate::LoadOutcome::Missing`] and surfaced through [`crate::DataEvents`].

use std::path::PathBuf;

/// Top-level error type for all servicedata operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceDataError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON serialization of provider output or the manifest failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Output validation error (unreadable manifest, wrong schema version).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ServiceDataError>;

impl ServiceDataError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for ServiceDataError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
