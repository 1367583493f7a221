//! Error types for the content-system client.

use thiserror::Error;

/// Error type for `galaxy-client` operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The underlying HTTP transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] galaxy_http::Error),

    /// A response body that was expected to be JSON (optionally zlib-wrapped)
    /// could not be parsed either way.
    #[error("failed to decompress/parse response from {url}: {reason}")]
    DecompressionFailed {
        /// The URL whose response failed to parse.
        url: String,
        /// Human-readable reason.
        reason: String,
    },

    /// A required JSON field was missing or had the wrong shape.
    #[error("schema error in {context}: {reason}")]
    SchemaError {
        /// What was being parsed (e.g. "repository.json").
        context: String,
        /// Human-readable reason.
        reason: String,
    },

    /// Neither the V1 nor V2 manifest probe succeeded during auto-detection.
    #[error("manifest not found for identifier {identifier}")]
    ManifestNotFound {
        /// The identifier that was probed.
        identifier: String,
    },

    /// No CDN endpoint in the secure link response matched the caller's
    /// preferred-endpoint list or the fallback array order.
    #[error("no usable CDN endpoint for path {path}")]
    NoUsableEndpoint {
        /// The path the secure link was requested for.
        path: String,
    },
}

/// Result type for `galaxy-client` operations.
pub type Result<T> = std::result::Result<T, Error>;
