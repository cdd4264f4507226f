//! Error types for roster-core.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration problems detected before any store or platform call.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more required variables are absent or empty. Lists every one.
    #[error("missing required environment variables: {}", keys.join(", "))]
    Missing { keys: Vec<&'static str> },

    /// A variable is present but cannot be parsed.
    #[error("invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Errors that abort roster ingestion.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The roster file does not exist.
    #[error("roster file not found: {path}")]
    NotFound { path: PathBuf },

    /// Underlying I/O failure while opening or reading the roster.
    #[error("I/O error reading roster at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The header row could not be decoded.
    #[error("failed to read roster header at {path}: {source}")]
    Header {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Convenience constructor for [`IngestError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> IngestError {
    IngestError::Io {
        path: path.into(),
        source,
    }
}
