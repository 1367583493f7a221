//! Content-addressed path layout and streaming hash primitives for GOG Galaxy
//! content-system mirrors.
//!
//! Every hash handled by this crate is a lowercase 32-character hex MD5 digest.
//! Comparisons are always case-insensitive; this crate is the single place that
//! normalizes case, so callers elsewhere in the workspace can compare hashes with
//! plain `==`.

mod error;
mod path;
mod progress;
mod stream;
mod zlib;

pub use error::{Error, Result};
pub use path::galaxy_path;
pub use progress::ProgressSink;
pub use stream::{md5_hex_bytes, md5_hex_stream};
pub use zlib::is_zlib_wrapped;

/// Size of the read buffer used when streaming bytes through MD5.
///
/// Matches `CHUNK_READ_SIZE` in the original Python implementation.
pub const STREAM_BUFFER_SIZE: usize = 16 * 1024;
