//! Shared binary record layouts for the RGOG archive format (spec.md §3, §6).
//!
//! This crate is pure: it only defines the header, metadata, and chunk record
//! layouts and their manual little-endian (de)serialization, plus the
//! language-bitset table and multi-part filename helpers. `rgog-pack` writes
//! these records; `rgog-unpack` reads them back. Neither crate should need to
//! know a record's byte layout directly — they go through here.

mod error;
mod header;
mod langbits;
mod metadata;
mod parts;

pub use error::{Error, Result};
pub use header::{align_to, ArchiveType, RgogHeader, Sections, SectionDescriptor, HEADER_SIZE, RGOG_MAGIC, RGOG_VERSION, SECTION_ALIGNMENT};
pub use langbits::{decode_languages, encode_languages, LANGUAGE_TABLE};
pub use metadata::{
    md5_hex_to_bytes, BuildMetadataRecord, ChunkMetadataRecord, ManifestMetadataRecord, OsCode, ProductMetadata,
    BUILD_METADATA_FIXED_SIZE, CHUNK_METADATA_RECORD_SIZE, MANIFEST_METADATA_RECORD_SIZE,
};
pub use parts::{part_zero_path, sequential_part_path};
