//! Packs an archived GOG Galaxy mirror into a deterministic RGOG binary
//! archive (spec.md §4.8).
//!
//! [`scan::scan_mirror`] groups a mirror's `v2/meta/` documents into builds,
//! [`plan::plan_parts`] splits their chunks across parts by byte budget, and
//! [`writer::pack`] lays out every section's bytes analytically and writes
//! the part files. Callers only need [`pack`] and [`PackOptions`].

mod error;
mod plan;
mod scan;
mod writer;

pub use error::{Error, Result};
pub use plan::{plan_parts, PlannedChunk, DEFAULT_MAX_PART_SIZE};
pub use scan::{scan_mirror, ScannedBuild, ScannedManifest};
pub use writer::{pack, PackOptions, PackReport};
