//! Error types for manifest parsing and diffing.

use thiserror::Error;

/// Error type for `galaxy-manifest` operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A required JSON field was missing from a manifest or depot descriptor.
    #[error("missing required field `{field}` in {context}")]
    MissingField {
        /// What was being parsed.
        context: &'static str,
        /// The missing field's name.
        field: &'static str,
    },

    /// The manifest JSON did not parse at all.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A patch document did not use the `xdelta3` algorithm.
    #[error("unsupported patch algorithm: {0}")]
    UnsupportedPatchAlgorithm(String),
}

/// Result type for `galaxy-manifest` operations.
pub type Result<T> = std::result::Result<T, Error>;
