//! The RGOG packer entry point (spec.md §4.8).
//!
//! Unlike `casc-storage::archive::archive_writer`'s seek-back-and-patch idiom,
//! every section offset here is computed analytically before a single byte is
//! written: packing already requires reading every build's metadata into
//! memory to group builds, dedupe chunks, and plan parts, so by the time
//! writing starts every offset is already known. This produces the exact same
//! on-disk bytes the seek-and-patch approach would, without a `Seek` bound on
//! the writer (see DESIGN.md).

use crate::plan::{plan_parts, PlannedChunk, DEFAULT_MAX_PART_SIZE};
use crate::scan::scan_mirror;
use crate::Result;
use galaxy_manifest::parse_v2_manifest;
use galaxy_mirror::{decode_bytes, MirrorTree};
use rgog_format::{
    align_to, encode_languages, md5_hex_to_bytes, ArchiveType, BuildMetadataRecord, ChunkMetadataRecord,
    ManifestMetadataRecord, OsCode, ProductMetadata, RgogHeader, Sections, HEADER_SIZE, SECTION_ALIGNMENT,
};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Options controlling one pack run. An archive is always scoped to a single
/// product (spec §4.8: "Packing algorithm, for one build or one product-level
/// archive").
#[derive(Debug, Clone)]
pub struct PackOptions {
    pub product_id: u64,
    /// Display name stored in `ProductMetadata`. No product name is ever
    /// observed anywhere on the content-system wire formats this repository
    /// models, so this defaults to `product_id`'s decimal form when unset
    /// (see DESIGN.md).
    pub product_name: Option<String>,
    /// Tag applied to every `BuildMetadataRecord.os` this pack writes. The V2
    /// on-disk layout scanned here carries no platform field of its own.
    pub os: OsCode,
    pub max_part_size: u64,
}

impl PackOptions {
    pub fn new(product_id: u64) -> Self {
        Self {
            product_id,
            product_name: None,
            os: OsCode::Null,
            max_part_size: DEFAULT_MAX_PART_SIZE,
        }
    }
}

/// Summary of one pack run.
#[derive(Debug, Clone, Default)]
pub struct PackReport {
    pub parts_written: Vec<PathBuf>,
    pub total_builds: u16,
    pub total_chunks: u32,
    pub warnings: Vec<String>,
}

struct PreparedManifest {
    depot_id: [u8; 16],
    languages_lo: u64,
    languages_hi: u64,
    bytes: Vec<u8>,
}

struct PreparedBuild {
    build_id: u64,
    repository_id: [u8; 16],
    repository_bytes: Vec<u8>,
    manifests: Vec<PreparedManifest>,
}

fn write_zeros<W: Write>(writer: &mut W, count: u64) -> Result<()> {
    const CHUNK: usize = 4096;
    let mut remaining = count;
    let zeros = [0u8; CHUNK];
    while remaining > 0 {
        let take = remaining.min(CHUNK as u64) as usize;
        writer.write_all(&zeros[..take])?;
        remaining -= take as u64;
    }
    Ok(())
}

fn pad_to<W: Write>(writer: &mut W, pos: &mut u64, target: u64) -> Result<()> {
    debug_assert!(target >= *pos);
    write_zeros(writer, target - *pos)?;
    *pos = target;
    Ok(())
}

/// Packs `mirror_root`'s `v2/` tree into one or more RGOG parts written
/// alongside/under `out_stem` (spec §4.8, §6).
pub fn pack(mirror_root: &Path, out_stem: &Path, opts: &PackOptions) -> Result<PackReport> {
    let mut warnings = Vec::new();
    let (builds, scan_warnings) = scan_mirror(mirror_root, opts.os)?;
    warnings.extend(scan_warnings);

    let tree = MirrorTree::new(mirror_root);
    let product_id_str = opts.product_id.to_string();

    let mut prepared_builds = Vec::new();
    // Global dedup across the whole archive, keyed by compressed MD5 (see
    // DESIGN.md: spec only requires per-build dedup, this additionally dedupes
    // archive-wide for size).
    let mut chunk_sizes: BTreeMap<String, u64> = BTreeMap::new();

    for build in &builds {
        let manifests: Vec<_> = build.manifests.iter().filter(|m| m.product_id == product_id_str).collect();
        if manifests.is_empty() {
            continue; // build carries no content for this product; not part of this archive
        }

        let mut prepared_manifests = Vec::new();
        let mut seen_in_build = std::collections::HashSet::new();
        for manifest in &manifests {
            let depot_id = match md5_hex_to_bytes(&manifest.depot_hash) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warnings.push(format!("build {}: bad depot hash {}: {err}", build.build_id, manifest.depot_hash));
                    continue;
                }
            };
            let (languages_lo, languages_hi) = encode_languages(&manifest.languages);
            prepared_manifests.push(PreparedManifest {
                depot_id,
                languages_lo,
                languages_hi,
                bytes: manifest.bytes.clone(),
            });

            if manifest.is_offline {
                continue; // offline depot chunks are never collected (spec §4.6 step 2, §4.8 step 3)
            }

            let document = match decode_bytes(&manifest.bytes) {
                Ok(doc) => doc,
                Err(err) => {
                    warnings.push(format!("build {}: manifest {} failed to decode: {err}", build.build_id, manifest.depot_hash));
                    continue;
                }
            };
            let parsed = match parse_v2_manifest(&document) {
                Ok(m) => m,
                Err(err) => {
                    warnings.push(format!("build {}: manifest {} failed to parse: {err}", build.build_id, manifest.depot_hash));
                    continue;
                }
            };
            let chunk_refs = parsed
                .depot_files()
                .flat_map(|f| f.chunks.iter())
                .chain(parsed.patch_entries().flat_map(|p| p.chunks.iter()));
            for chunk in chunk_refs {
                if !seen_in_build.insert(chunk.compressed_md5.clone()) {
                    continue;
                }
                let store_path = tree.v2_store_path(&product_id_str, &chunk.compressed_md5);
                match std::fs::metadata(&store_path) {
                    Ok(meta) => {
                        chunk_sizes.entry(chunk.compressed_md5.clone()).or_insert(meta.len());
                    }
                    Err(_) => {
                        warnings.push(format!(
                            "build {}: chunk {} referenced but missing on disk at {}",
                            build.build_id,
                            chunk.compressed_md5,
                            store_path.display()
                        ));
                    }
                }
            }
        }

        let repository_id = match md5_hex_to_bytes(&build.repository_hash) {
            Ok(bytes) => bytes,
            Err(err) => {
                warnings.push(format!("build {}: bad repository hash {}: {err}", build.build_id, build.repository_hash));
                continue;
            }
        };

        prepared_builds.push(PreparedBuild {
            build_id: build.build_id,
            repository_id,
            repository_bytes: build.repository_bytes.clone(),
            manifests: prepared_manifests,
        });
    }

    let planned_chunks: Vec<PlannedChunk> = chunk_sizes
        .into_iter()
        .map(|(md5, size)| PlannedChunk {
            source_path: tree.v2_store_path(&product_id_str, &md5),
            compressed_md5: md5,
            size,
        })
        .collect();

    let product_metadata = ProductMetadata {
        product_id: opts.product_id,
        name: opts.product_name.clone().unwrap_or_else(|| product_id_str.clone()),
    };

    let build_records: Vec<BuildMetadataRecord> = prepared_builds
        .iter()
        .map(|build| BuildMetadataRecord {
            build_id: build.build_id,
            os: opts.os,
            repository_id: build.repository_id,
            repo_offset: 0,
            repo_size: build.repository_bytes.len() as u64,
            manifests: build
                .manifests
                .iter()
                .map(|m| ManifestMetadataRecord {
                    depot_id: m.depot_id,
                    offset: 0,
                    size: m.bytes.len() as u64,
                    languages_lo: m.languages_lo,
                    languages_hi: m.languages_hi,
                })
                .collect(),
        })
        .collect();

    let build_metadata_total_size: u64 = build_records.iter().map(BuildMetadataRecord::encoded_size).sum();
    let first_part_overhead = HEADER_SIZE + product_metadata.encoded_size() + build_metadata_total_size;

    let parts = plan_parts(&planned_chunks, first_part_overhead, opts.max_part_size);
    let total_parts = parts.len() as u32;
    let total_builds = prepared_builds.len() as u16;
    let total_chunks = planned_chunks.len() as u32;

    let part_paths: Vec<PathBuf> = if parts.len() <= 1 {
        vec![out_stem.to_path_buf()]
    } else {
        (0..parts.len()).map(|i| rgog_format::sequential_part_path(out_stem, i as u32)).collect()
    };

    for (part_index, chunk_indices) in parts.iter().enumerate() {
        let path = &part_paths[part_index];
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        if part_index == 0 {
            write_part_zero(&mut writer, &product_metadata, &build_records, &prepared_builds, &planned_chunks, chunk_indices, total_builds, total_chunks, total_parts)?;
        } else {
            write_chunk_only_part(&mut writer, &planned_chunks, chunk_indices, total_builds, total_chunks, total_parts, part_index as u32)?;
        }
        writer.flush()?;
    }

    Ok(PackReport {
        parts_written: part_paths,
        total_builds,
        total_chunks,
        warnings,
    })
}

#[allow(clippy::too_many_arguments)]
fn write_part_zero<W: Write>(
    writer: &mut W,
    product_metadata: &ProductMetadata,
    build_records: &[BuildMetadataRecord],
    prepared_builds: &[PreparedBuild],
    planned_chunks: &[PlannedChunk],
    chunk_indices: &[usize],
    total_builds: u16,
    total_chunks: u32,
    total_parts: u32,
) -> Result<()> {
    let product_metadata_offset = align_to(HEADER_SIZE, SECTION_ALIGNMENT);
    let product_metadata_size = product_metadata.encoded_size();

    let build_metadata_offset = align_to(product_metadata_offset + product_metadata_size, SECTION_ALIGNMENT);
    let build_metadata_size: u64 = build_records.iter().map(BuildMetadataRecord::encoded_size).sum();

    let build_files_offset = align_to(build_metadata_offset + build_metadata_size, SECTION_ALIGNMENT);

    // Lay out BuildFiles and compute each build's/manifest's relative offset.
    let mut build_records = build_records.to_vec();
    let mut running: u64 = 0;
    for (build, record) in prepared_builds.iter().zip(build_records.iter_mut()) {
        record.repo_offset = running;
        running += build.repository_bytes.len() as u64;
        for (manifest, manifest_record) in build.manifests.iter().zip(record.manifests.iter_mut()) {
            manifest_record.offset = running;
            running += manifest.bytes.len() as u64;
        }
    }
    let build_files_size = running;

    let chunk_metadata_offset = align_to(build_files_offset + build_files_size, SECTION_ALIGNMENT);
    let chunk_metadata_size = chunk_indices.len() as u64 * rgog_format::CHUNK_METADATA_RECORD_SIZE;

    let chunk_files_offset = align_to(chunk_metadata_offset + chunk_metadata_size, SECTION_ALIGNMENT);
    let chunk_files_size: u64 = chunk_indices.iter().map(|&i| planned_chunks[i].size).sum();

    let header = RgogHeader {
        version: rgog_format::RGOG_VERSION,
        archive_type: ArchiveType::Base,
        part_number: 0,
        total_parts,
        total_builds,
        total_chunks,
        local_chunks: chunk_indices.len() as u32,
        sections: Sections {
            product_metadata: rgog_format::SectionDescriptor { offset: product_metadata_offset, size: product_metadata_size },
            build_metadata: rgog_format::SectionDescriptor { offset: build_metadata_offset, size: build_metadata_size },
            build_files: rgog_format::SectionDescriptor { offset: build_files_offset, size: build_files_size },
            chunk_metadata: rgog_format::SectionDescriptor { offset: chunk_metadata_offset, size: chunk_metadata_size },
            chunk_files: rgog_format::SectionDescriptor { offset: chunk_files_offset, size: chunk_files_size },
        },
    };

    let mut pos = 0u64;
    header.write(writer)?;
    pos += HEADER_SIZE;

    pad_to(writer, &mut pos, product_metadata_offset)?;
    product_metadata.write(writer)?;
    pos += product_metadata_size;

    pad_to(writer, &mut pos, build_metadata_offset)?;
    for record in &build_records {
        record.write(writer)?;
        pos += record.encoded_size();
    }

    pad_to(writer, &mut pos, build_files_offset)?;
    for build in prepared_builds {
        writer.write_all(&build.repository_bytes)?;
        pos += build.repository_bytes.len() as u64;
        for manifest in &build.manifests {
            writer.write_all(&manifest.bytes)?;
            pos += manifest.bytes.len() as u64;
        }
    }

    pad_to(writer, &mut pos, chunk_metadata_offset)?;
    let mut chunk_running: u64 = 0;
    for &index in chunk_indices {
        let chunk = &planned_chunks[index];
        let record = ChunkMetadataRecord {
            compressed_md5: md5_hex_to_bytes(&chunk.compressed_md5)?,
            offset: chunk_running,
            size: chunk.size,
        };
        record.write(writer)?;
        pos += rgog_format::CHUNK_METADATA_RECORD_SIZE;
        chunk_running += chunk.size;
    }

    pad_to(writer, &mut pos, chunk_files_offset)?;
    for &index in chunk_indices {
        let chunk = &planned_chunks[index];
        let mut source = File::open(&chunk.source_path)?;
        std::io::copy(&mut source, writer)?;
        pos += chunk.size;
    }

    let _ = pos;
    Ok(())
}

fn write_chunk_only_part<W: Write>(
    writer: &mut W,
    planned_chunks: &[PlannedChunk],
    chunk_indices: &[usize],
    total_builds: u16,
    total_chunks: u32,
    total_parts: u32,
    part_number: u32,
) -> Result<()> {
    let chunk_metadata_offset = align_to(HEADER_SIZE, SECTION_ALIGNMENT);
    let chunk_metadata_size = chunk_indices.len() as u64 * rgog_format::CHUNK_METADATA_RECORD_SIZE;
    let chunk_files_offset = align_to(chunk_metadata_offset + chunk_metadata_size, SECTION_ALIGNMENT);
    let chunk_files_size: u64 = chunk_indices.iter().map(|&i| planned_chunks[i].size).sum();

    let header = RgogHeader {
        version: rgog_format::RGOG_VERSION,
        archive_type: ArchiveType::Base,
        part_number,
        total_parts,
        total_builds,
        total_chunks,
        local_chunks: chunk_indices.len() as u32,
        sections: Sections {
            product_metadata: rgog_format::SectionDescriptor::default(),
            build_metadata: rgog_format::SectionDescriptor::default(),
            build_files: rgog_format::SectionDescriptor::default(),
            chunk_metadata: rgog_format::SectionDescriptor { offset: chunk_metadata_offset, size: chunk_metadata_size },
            chunk_files: rgog_format::SectionDescriptor { offset: chunk_files_offset, size: chunk_files_size },
        },
    };

    let mut pos = 0u64;
    header.write(writer)?;
    pos += HEADER_SIZE;

    pad_to(writer, &mut pos, chunk_metadata_offset)?;
    let mut chunk_running: u64 = 0;
    for &index in chunk_indices {
        let chunk = &planned_chunks[index];
        let record = ChunkMetadataRecord {
            compressed_md5: md5_hex_to_bytes(&chunk.compressed_md5)?,
            offset: chunk_running,
            size: chunk.size,
        };
        record.write(writer)?;
        pos += rgog_format::CHUNK_METADATA_RECORD_SIZE;
        chunk_running += chunk.size;
    }

    pad_to(writer, &mut pos, chunk_files_offset)?;
    for &index in chunk_indices {
        let chunk = &planned_chunks[index];
        let mut source = File::open(&chunk.source_path)?;
        std::io::copy(&mut source, writer)?;
        pos += chunk.size;
    }

    let _ = pos;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::tempdir;

    fn write_meta(root: &Path, hash: &str, json: &serde_json::Value) {
        let path = root.join("v2/meta").join(&hash[0..2]).join(&hash[2..4]).join(hash);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, json.to_string()).unwrap();
    }

    fn write_store_chunk(root: &Path, product_id: &str, md5: &str, bytes: &[u8]) {
        let tree = MirrorTree::new(root);
        let path = tree.v2_store_path(product_id, md5);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    fn md5_of(bytes: &[u8]) -> String {
        format!("{:032x}", md5::compute(bytes))
    }

    #[test]
    fn packs_a_single_build_single_chunk_archive() {
        let dir = tempdir().unwrap();
        let root = dir.path();

        let chunk_bytes = b"hello chunk";
        let chunk_md5 = md5_of(chunk_bytes);
        write_store_chunk(root, "99", &chunk_md5, chunk_bytes);

        let manifest_hash = "22222222222222222222222222222222";
        write_meta(
            root,
            manifest_hash,
            &serde_json::json!({
                "depot": {
                    "items": [{
                        "type": "DepotFile",
                        "path": "file.bin",
                        "size": chunk_bytes.len(),
                        "chunks": [{
                            "compressed_md5": chunk_md5,
                            "compressed_size": chunk_bytes.len(),
                            "uncompressed_md5": chunk_md5,
                            "uncompressed_size": chunk_bytes.len(),
                        }],
                        "md5": chunk_md5,
                    }]
                }
            }),
        );
        write_meta(
            root,
            "11111111111111111111111111111111",
            &serde_json::json!({
                "buildId": "7",
                "depots": [{"productId": "99", "languages": ["en-US"], "manifest": manifest_hash}]
            }),
        );

        let out = dir.path().join("out.rgog");
        let opts = PackOptions::new(99);
        let report = pack(root, &out, &opts).unwrap();

        assert_eq!(report.parts_written, vec![out.clone()]);
        assert_eq!(report.total_builds, 1);
        assert_eq!(report.total_chunks, 1);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);

        let bytes = std::fs::read(&out).unwrap();
        assert!(bytes.len() as u64 >= HEADER_SIZE);
        let header = RgogHeader::read(&mut std::io::Cursor::new(&bytes[..HEADER_SIZE as usize])).unwrap();
        assert_eq!(header.total_builds, 1);
        assert_eq!(header.total_chunks, 1);
        assert_eq!(header.local_chunks, 1);
        assert_eq!(header.total_parts, 1);
    }

    #[test]
    fn missing_chunk_file_produces_a_warning_not_a_failure() {
        let dir = tempdir().unwrap();
        let root = dir.path();

        let manifest_hash = "33333333333333333333333333333333";
        write_meta(
            root,
            manifest_hash,
            &serde_json::json!({
                "depot": {
                    "items": [{
                        "type": "DepotFile",
                        "path": "file.bin",
                        "size": 10,
                        "chunks": [{
                            "compressed_md5": "deadbeefdeadbeefdeadbeefdeadbeef",
                            "compressed_size": 10,
                            "uncompressed_md5": "deadbeefdeadbeefdeadbeefdeadbeef",
                            "uncompressed_size": 10,
                        }]
                    }]
                }
            }),
        );
        write_meta(
            root,
            "44444444444444444444444444444444",
            &serde_json::json!({
                "buildId": "1",
                "depots": [{"productId": "1", "languages": ["en-US"], "manifest": manifest_hash}]
            }),
        );

        let out = dir.path().join("out.rgog");
        let opts = PackOptions::new(1);
        let report = pack(root, &out, &opts).unwrap();
        assert_eq!(report.total_chunks, 0);
        assert!(!report.warnings.is_empty());
    }

    #[test]
    fn pack_is_deterministic_across_runs() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let chunk_bytes = b"deterministic payload";
        let chunk_md5 = md5_of(chunk_bytes);
        write_store_chunk(root, "5", &chunk_md5, chunk_bytes);
        let manifest_hash = "55555555555555555555555555555555";
        write_meta(
            root,
            manifest_hash,
            &serde_json::json!({
                "depot": {"items": [{
                    "type": "DepotFile", "path": "a", "size": chunk_bytes.len(),
                    "chunks": [{"compressedMd5": chunk_md5, "compressedSize": chunk_bytes.len(), "md5": chunk_md5, "size": chunk_bytes.len()}]
                }]}
            }),
        );
        write_meta(
            root,
            "66666666666666666666666666666666",
            &serde_json::json!({"buildId": "3", "depots": [{"productId": "5", "languages": ["en-US"], "manifest": manifest_hash}]}),
        );

        let opts = PackOptions::new(5);
        let out_a = dir.path().join("a.rgog");
        let out_b = dir.path().join("b.rgog");
        pack(root, &out_a, &opts).unwrap();
        pack(root, &out_b, &opts).unwrap();
        assert_eq!(std::fs::read(out_a).unwrap(), std::fs::read(out_b).unwrap());
    }
}
