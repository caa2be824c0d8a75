//! Centralized error types for mailvault.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailvault library.
#[derive(Error, Debug)]
pub enum VaultError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified input does not exist.
    #[error("Input not found: {0}")]
    NotFound(PathBuf),

    /// The file extension maps to no known adapter.
    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(PathBuf),

    /// An adapter failed to parse a well-located file.
    #[error("Extraction failed for '{path}': {reason}")]
    Extraction { path: PathBuf, reason: String },

    /// The external conversion tool could not be resolved anywhere.
    #[error("External conversion tool '{0}' is not available")]
    ToolUnavailable(String),

    /// The external conversion tool ran but exited non-zero for one archive.
    #[error("'{tool}' failed on '{archive}' (exit {status}): {stderr}")]
    ToolFailed {
        tool: String,
        archive: PathBuf,
        status: i32,
        stdout: String,
        stderr: String,
    },

    /// The primary text destination cannot be opened or written.
    #[error("Cannot write output '{path}': {source}")]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The character encoding is not supported.
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// JSON (de)serialization failure.
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A request carried missing or malformed parameters.
    #[error("{0}")]
    InvalidRequest(String),
}

/// Convenience alias for `Result<T, VaultError>`.
pub type Result<T> = std::result::Result<T, VaultError>;

impl VaultError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an `Output` variant from a path and an `io::Error`.
    pub fn output(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Output {
            path: path.into(),
            source,
        }
    }

    /// Create an `Extraction` variant from a path and any displayable cause.
    pub fn extraction(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Extraction {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `VaultError`
/// when no path context is available (rare; prefer `VaultError::io`).
impl From<std::io::Error> for VaultError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
