//! Error types for RGOG verification and unpacking.

use thiserror::Error;

/// Error type for `rgog-unpack` operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A record failed to decode.
    #[error("RGOG record error: {0}")]
    Format(#[from] rgog_format::Error),

    /// A manifest failed to parse while building the uncompressed-MD5 index
    /// used by `--full` verification.
    #[error("manifest error: {0}")]
    Manifest(#[from] galaxy_manifest::Error),

    /// Reading/decoding an archived document failed.
    #[error("mirror error: {0}")]
    Mirror(#[from] galaxy_mirror::Error),

    /// JSON (de)serialization failure for a debug pretty-print copy.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Underlying I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A part file named by `total_parts` could not be located on disk under
    /// either naming convention (spec §6).
    #[error("part {index} of archive {stem} not found on disk")]
    PartNotFound { stem: String, index: u32 },

    /// A header in a part other than part 0 disagreed with part 0 about
    /// `total_parts`/`total_builds`/`total_chunks`, meaning the parts on disk
    /// do not belong to the same archive.
    #[error("part {index} header disagrees with part 0: {detail}")]
    InconsistentParts { index: u32, detail: String },
}

/// Result type for `rgog-unpack` operations.
pub type Result<T> = std::result::Result<T, Error>;
