//! Error types for RGOG packing.

use thiserror::Error;

/// Error type for `rgog-pack` operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A record failed to encode.
    #[error("RGOG record error: {0}")]
    Format(#[from] rgog_format::Error),

    /// A manifest or depot descriptor failed to parse.
    #[error("manifest error: {0}")]
    Manifest(#[from] galaxy_manifest::Error),

    /// Reading an already-archived mirror document failed.
    #[error("mirror error: {0}")]
    Mirror(#[from] galaxy_mirror::Error),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Underlying I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for `rgog-pack` operations.
pub type Result<T> = std::result::Result<T, Error>;
