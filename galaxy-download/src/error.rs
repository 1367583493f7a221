//! Error types for download-engine operations.

use thiserror::Error;

/// Error type for `galaxy-download` operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The HTTP transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] galaxy_http::Error),

    /// A hashing operation failed at the I/O layer.
    #[error("hashing error: {0}")]
    Hash(#[from] galaxy_hash::Error),

    /// A downloaded artifact did not MD5-match its content-addressed identity.
    /// The partial/mismatched file has already been deleted by the time this is
    /// returned, per spec §7.
    #[error("hash mismatch for {what}: expected {expected}, got {actual}")]
    HashMismatch {
        /// What was being verified (a path or a chunk hash).
        what: String,
        expected: String,
        actual: String,
    },

    /// A chunk could not be fetched from any CDN endpoint.
    #[error("failed to fetch chunk {hash} from any CDN endpoint")]
    ChunkFetchFailed {
        /// The chunk's compressed MD5.
        hash: String,
    },

    /// zlib inflation of a payload expected to decompress failed.
    #[error("decompression failed for {what}: {reason}")]
    DecompressionFailed { what: String, reason: String },

    /// An `sfcRef` exceeded the bounds of the small-files-container buffer.
    #[error("sfcRef out of bounds: offset {offset} + size {size} > buffer length {buffer_len}")]
    SfcOutOfBounds {
        offset: u64,
        size: u64,
        buffer_len: u64,
    },

    /// Underlying I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for `galaxy-download` operations.
pub type Result<T> = std::result::Result<T, Error>;
