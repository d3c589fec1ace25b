//! Error types for sftp-dl
//!
//! This module provides the error taxonomy for the library:
//! - Environmental failures (missing paths, permissions, I/O)
//! - Transfer failures (size mismatch, transport anomalies)
//! - Internal invariant violations (transfer stall)
//!
//! An oversized file is deliberately *not* an error: it is recorded as a
//! skipped outcome in the [`BatchReport`](crate::types::BatchReport).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sftp-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for sftp-dl
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "window_capacity")
        key: Option<String>,
    },

    /// Remote or local path does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Access denied on a specific entry
    ///
    /// During a listing-driven batch this usually means the entry is actually
    /// a directory (or otherwise unsupported) and the task is skipped rather
    /// than failing the batch.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Post-transfer size check failed
    ///
    /// The partial local file is left in place for diagnostics.
    #[error("size mismatch for {path}: remote reported {expected} bytes, local has {actual}")]
    SizeMismatch {
        /// Local path of the (partial) downloaded file
        path: PathBuf,
        /// Size reported by the remote session at open time
        expected: u64,
        /// Size actually written locally
        actual: u64,
    },

    /// Unexpected response type or shape from the remote session
    #[error("transport error: {0}")]
    Transport(String),

    /// Internal invariant violation: the request window is full but no
    /// progress is possible
    ///
    /// Indicates a protocol desynchronization or a bug rather than an
    /// environmental failure, and is surfaced distinctly for that reason.
    #[error("transfer stalled: {0}")]
    Stall(String),

    /// Re-establishing the remote session failed
    ///
    /// Reconnect failures are fatal to the batch and propagate to the caller.
    #[error("reconnect failed: {0}")]
    Reconnect(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error should skip the current task instead of failing it.
    ///
    /// Permission errors on a listing-driven batch indicate the entry is a
    /// directory or otherwise unsupported; the batch records a skip and moves on.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Error::Permission(_))
    }
}
