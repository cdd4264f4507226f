//! Error types for roster-sync.

use thiserror::Error;

use roster_core::{ConfigError, IngestError};

use crate::orchestrator::InvalidTransition;

/// Failures talking to the identity store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The pool could not establish its first connection.
    #[error("failed to connect to identity store at {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: sqlx::Error,
    },

    /// A query failed after the connection was established.
    #[error("identity store query '{query}' failed: {source}")]
    Query {
        query: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

/// Failures calling the external platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The platform answered with a non-success status.
    #[error("{route} returned HTTP {status}: {body}")]
    Status {
        route: String,
        status: u16,
        body: String,
    },

    /// The request never produced a response (DNS, connect, timeout, TLS).
    #[error("{route} transport error: {message}")]
    Transport { route: String, message: String },

    /// The response body could not be decoded.
    #[error("{route} returned an undecodable body: {source}")]
    Decode {
        route: String,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be configured.
    #[error("invalid platform client configuration: {0}")]
    Config(String),

    /// The blocking worker running the request panicked or was cancelled.
    #[error("platform worker task failed: {0}")]
    Join(String),
}

/// Batch-level failures. Each one aborts the run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("roster error: {0}")]
    Ingest(#[from] IngestError),

    #[error("identity store error: {0}")]
    Store(#[from] StoreError),

    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    /// A live precondition check failed before any record was processed.
    #[error("preflight check '{check}' failed: {reason}")]
    Preflight { check: &'static str, reason: String },

    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}
