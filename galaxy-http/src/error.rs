//! Error types for HTTP transport operations.

use thiserror::Error;

/// Error type for `galaxy-http` operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The underlying HTTP request failed (after retries were exhausted).
    #[error("HTTP request to {url} failed: {source}")]
    Http {
        /// The URL that was being requested.
        url: String,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// The request timed out.
    #[error("request to {url} timed out after {duration_ms}ms")]
    Timeout {
        /// The URL that was being requested.
        url: String,
        /// The timeout that was exceeded, in milliseconds.
        duration_ms: u64,
    },

    /// A non-success, non-retryable status code (4xx) was returned.
    #[error("request to {url} returned {status}")]
    Status {
        /// The URL that was being requested.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The credential provider could not produce a usable token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// `Content-Length` did not match the expected size.
    #[error("size mismatch for {url}: expected {expected} bytes, got {actual} bytes")]
    SizeMismatch {
        /// The URL that was being requested.
        url: String,
        /// Expected size in bytes.
        expected: u64,
        /// Actual size in bytes.
        actual: u64,
    },

    /// Underlying I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for `galaxy-http` operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True if this error represents a condition the transport already retried
    /// internally to exhaustion — callers one layer up (e.g. the download engine)
    /// use this to decide whether a bulk operation should count the failure as
    /// `Transient` (per spec §7) rather than surface it immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Timeout { .. })
            || matches!(self, Error::Http { source, .. } if source.is_connect() || source.is_timeout())
    }

    /// True if this error represents an HTTP 404 — never retried, reported as
    /// `NotFound` per spec §7.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Status { status: 404, .. })
    }
}
