//! The content download engine (spec §4.5).
//!
//! Three fetch shapes, one per manifest generation plus the small-files
//! container: V1 parallel-range blob download into a pre-allocated file, V2
//! content-addressed chunk fetch + item assembly, and SFC extraction. All
//! bulk operations accumulate per-item failures rather than failing fast
//! (spec §7) and dedupe chunks by MD5 up front rather than coalescing
//! in-flight requests (spec §4.5, §5).

mod depot;
mod error;
mod sfc;
mod v1;
mod v2;

pub use depot::{download_depot, item_output_path, DepotDownloadOptions, DepotDownloadStats};
pub use error::{Error, Result};
pub use sfc::extract_sfc;
pub use v1::{download_v1_blob, DEFAULT_SUB_RANGE_SIZE, DEFAULT_WORKERS as V1_DEFAULT_WORKERS, SINGLE_FILE_SUB_RANGE_SIZE};
pub use v2::{
    assemble_item, assemble_raw_chunks, fetch_v2_chunk, fetch_v2_chunk_compressed, AssembleMode,
    RawChunkRecord, DEFAULT_WORKERS as V2_DEFAULT_WORKERS,
};
