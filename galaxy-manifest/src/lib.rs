//! V1/V2 manifest parsing, depot filtering, and manifest diff/patch-incorporation.
//!
//! This crate is pure: it has no network or filesystem dependencies. Callers
//! fetch raw (possibly zlib-wrapped) bytes via `galaxy-client`, decode them to
//! `serde_json::Value`, and hand them to [`parse_v1_manifest`] / [`parse_v2_manifest`].

mod diff;
mod error;
mod parse_v1;
mod parse_v2;
mod patch;
mod types;

pub use diff::{ManifestDiff, PatchedFile};
pub use error::{Error, Result};
pub use parse_v1::{normalize_path, parse_v1_manifest};
pub use parse_v2::parse_v2_manifest;
pub use patch::{check_algorithm, collect_patch_files, is_patchable, BuildRef, Patch, PatchDepotManifest};
pub use types::{
    depot_matches, Chunk, DepotAttributes, DepotFile, DepotFilter, FileEntryV1, ItemV2, Manifest,
    ManifestV1, ManifestV2, PatchEntry, SfcRef,
};
