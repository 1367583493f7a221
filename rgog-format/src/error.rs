//! Error types for RGOG record (de)serialization.

use thiserror::Error;

/// Error type for `rgog-format` operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The header's magic bytes were not `"RGOG"`.
    #[error("invalid RGOG magic: expected {expected:?}, got {actual:?}")]
    InvalidMagic { expected: [u8; 4], actual: [u8; 4] },

    /// A string field was not valid UTF-8.
    #[error("invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    /// Underlying I/O failure while reading or writing a record.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for `rgog-format` operations.
pub type Result<T> = std::result::Result<T, Error>;
