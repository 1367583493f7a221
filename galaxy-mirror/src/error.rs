//! Error types for mirror archiving and validation.

use thiserror::Error;

/// Error type for `galaxy-mirror` operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The content-system client failed.
    #[error("content-system client error: {0}")]
    Client(#[from] galaxy_client::Error),

    /// The download engine failed.
    #[error("download error: {0}")]
    Download(#[from] galaxy_download::Error),

    /// A manifest or depot descriptor failed to parse.
    #[error("manifest error: {0}")]
    Manifest(#[from] galaxy_manifest::Error),

    /// A hashing/path-primitive operation failed.
    #[error("hash error: {0}")]
    Hash(#[from] galaxy_hash::Error),

    /// Underlying I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure for a debug pretty-print copy.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// None of `{windows, mac, linux}` yielded a parseable `repository.json`
    /// during V1 platform auto-detection (spec §4.6 step 5).
    #[error("could not auto-detect platform for build {identifier}: no repository.json found under windows/mac/linux")]
    PlatformNotDetected {
        /// The build identifier that was probed.
        identifier: String,
    },
}

/// Result type for `galaxy-mirror` operations.
pub type Result<T> = std::result::Result<T, Error>;
