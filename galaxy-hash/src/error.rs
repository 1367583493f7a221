//! Error types for content-addressed path and hashing operations.

use thiserror::Error;

/// Error type for `galaxy-hash` operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying I/O failure while streaming bytes through a hasher.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for `galaxy-hash` operations.
pub type Result<T> = std::result::Result<T, Error>;
