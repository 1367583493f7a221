//! RGOG integrity verification (spec.md §4.9, §8).
//!
//! Walks every part's BuildMetadata/ChunkMetadata records and cross-checks
//! their declared MD5 identity against the bytes actually on disk, the same
//! invariant [`galaxy_mirror::MirrorValidator`] checks for an unpacked mirror
//! tree, but read straight out of the archive's `BuildFiles`/`ChunkFiles`
//! sections instead of individual files.

use crate::parts::{discover_parts, read_at, read_part};
use crate::Result;
use galaxy_manifest::Chunk;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Options controlling one verify run.
#[derive(Debug, Clone, Copy)]
pub struct VerifyOptions {
    /// Also inflate each chunk and compare against the `uncompressed_md5`
    /// resolved from the manifest index built while walking BuildMetadata
    /// (spec §4.9 step 5).
    pub full: bool,
    /// Number of worker threads used to re-hash a part's chunks.
    pub threads: usize,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            full: false,
            threads: std::thread::available_parallelism().map(std::num::NonZeroUsize::get).unwrap_or(4),
        }
    }
}

/// One integrity mismatch found during verification.
#[derive(Debug, Clone)]
pub struct Mismatch {
    pub what: String,
    pub detail: String,
}

/// Aggregate outcome of one verify run. Never stops at the first mismatch
/// (spec §4.9 step 5, §7): every build, manifest, and chunk is checked.
#[derive(Debug, Clone, Default)]
pub struct VerifyReport {
    pub parts_checked: u32,
    pub builds_checked: u64,
    pub manifests_checked: u64,
    pub chunks_checked: u64,
    pub mismatches: Vec<Mismatch>,
}

impl VerifyReport {
    fn record(&mut self, what: impl Into<String>, detail: impl Into<String>) {
        self.mismatches.push(Mismatch {
            what: what.into(),
            detail: detail.into(),
        });
    }

    /// True iff every check passed.
    pub fn ok(&self) -> bool {
        self.mismatches.is_empty()
    }
}

fn inflate_if_needed(bytes: Vec<u8>, expected_size: u64) -> Vec<u8> {
    if bytes.len() as u64 == expected_size {
        return bytes;
    }
    let mut decoder = flate2::read::ZlibDecoder::new(bytes.as_slice());
    let mut out = Vec::new();
    if decoder.read_to_end(&mut out).is_ok() {
        out
    } else {
        Vec::new()
    }
}

/// Verifies every part of the archive `path` belongs to (auto-redirecting to
/// part 0 by filename convention), per spec §4.9.
pub fn verify(path: &Path, opts: &VerifyOptions) -> Result<VerifyReport> {
    let part_paths = discover_parts(path)?;
    let mut report = VerifyReport {
        parts_checked: part_paths.len() as u32,
        ..VerifyReport::default()
    };

    // compressed_md5 -> (uncompressed_md5, uncompressed_size), built while
    // walking part 0's manifests so a second manifest pass is never needed
    // for `--full` (spec §4.9 step 5).
    let mut chunk_truth: HashMap<String, (String, u64)> = HashMap::new();

    for (index, part_path) in part_paths.iter().enumerate() {
        let contents = read_part(part_path)?;
        let index = index as u32;

        if index == 0 {
            let build_files_offset = contents.header.sections.build_files.offset;
            for build in &contents.builds {
                report.builds_checked += 1;
                let repo_bytes = read_at(part_path, build_files_offset + build.repo_offset, build.repo_size)?;
                let expected = hex::encode(build.repository_id);
                let actual = galaxy_hash::md5_hex_bytes(&repo_bytes);
                if actual != expected {
                    report.record(
                        format!("build {} repository", build.build_id),
                        format!("expected {expected}, got {actual}"),
                    );
                }

                for manifest in &build.manifests {
                    report.manifests_checked += 1;
                    let manifest_bytes = read_at(part_path, build_files_offset + manifest.offset, manifest.size)?;
                    let expected = hex::encode(manifest.depot_id);
                    let actual = galaxy_hash::md5_hex_bytes(&manifest_bytes);
                    if actual != expected {
                        report.record(
                            format!("build {} manifest {expected}", build.build_id),
                            format!("expected {expected}, got {actual}"),
                        );
                        continue;
                    }
                    if opts.full {
                        index_manifest_chunks(&manifest_bytes, &mut chunk_truth);
                    }
                }
            }
        }

        let chunk_files_offset = contents.header.sections.chunk_files.offset;
        let (checked, mismatches) = verify_chunks(part_path, chunk_files_offset, &contents.chunks, &chunk_truth, opts)?;
        report.chunks_checked += checked;
        report.mismatches.extend(mismatches);
    }

    Ok(report)
}

/// Re-hashes one part's chunks, splitting the work across `opts.threads`
/// scoped threads. Each thread owns a disjoint slice of `chunks` so there is
/// no contention beyond the shared, read-only `chunk_truth` index.
fn verify_chunks(
    part_path: &Path,
    chunk_files_offset: u64,
    chunks: &[rgog_format::ChunkMetadataRecord],
    chunk_truth: &HashMap<String, (String, u64)>,
    opts: &VerifyOptions,
) -> Result<(u64, Vec<Mismatch>)> {
    if chunks.is_empty() {
        return Ok((0, Vec::new()));
    }

    let worker_count = opts.threads.max(1).min(chunks.len());
    let chunk_size = chunks.len().div_ceil(worker_count);

    std::thread::scope(|scope| -> Result<(u64, Vec<Mismatch>)> {
        let handles: Vec<_> = chunks
            .chunks(chunk_size)
            .map(|slice| {
                scope.spawn(move || -> Result<Vec<Mismatch>> {
                    let mut mismatches = Vec::new();
                    for chunk in slice {
                        let expected = hex::encode(chunk.compressed_md5);
                        let bytes = read_at(part_path, chunk_files_offset + chunk.offset, chunk.size)?;
                        let actual = galaxy_hash::md5_hex_bytes(&bytes);
                        if actual != expected {
                            mismatches.push(Mismatch {
                                what: format!("chunk {expected}"),
                                detail: format!("compressed md5 mismatch: got {actual}"),
                            });
                            continue;
                        }

                        if opts.full {
                            match chunk_truth.get(&expected) {
                                Some((uncompressed_md5, uncompressed_size)) => {
                                    let inflated = inflate_if_needed(bytes, *uncompressed_size);
                                    if inflated.len() as u64 != *uncompressed_size {
                                        mismatches.push(Mismatch {
                                            what: format!("chunk {expected}"),
                                            detail: "failed to inflate to expected size".to_string(),
                                        });
                                        continue;
                                    }
                                    let actual_uncompressed = galaxy_hash::md5_hex_bytes(&inflated);
                                    if &actual_uncompressed != uncompressed_md5 {
                                        mismatches.push(Mismatch {
                                            what: format!("chunk {expected}"),
                                            detail: format!(
                                                "uncompressed md5 mismatch: expected {uncompressed_md5}, got {actual_uncompressed}"
                                            ),
                                        });
                                    }
                                }
                                None => {
                                    mismatches.push(Mismatch {
                                        what: format!("chunk {expected}"),
                                        detail: "no manifest reference found for --full verification".to_string(),
                                    });
                                }
                            }
                        }
                    }
                    Ok(mismatches)
                })
            })
            .collect();

        let mut mismatches = Vec::new();
        for handle in handles {
            mismatches.extend(handle.join().expect("chunk verification thread panicked")?);
        }
        Ok((chunks.len() as u64, mismatches))
    })
}

fn index_manifest_chunks(manifest_bytes: &[u8], chunk_truth: &mut HashMap<String, (String, u64)>) {
    let Ok(document) = galaxy_mirror::decode_bytes(manifest_bytes) else {
        return;
    };
    let Ok(parsed) = galaxy_manifest::parse_v2_manifest(&document) else {
        return;
    };
    let record_chunk = |chunk: &Chunk, map: &mut HashMap<String, (String, u64)>| {
        map.entry(chunk.compressed_md5.clone())
            .or_insert_with(|| (chunk.uncompressed_md5.clone(), chunk.uncompressed_size));
    };
    for file in parsed.depot_files() {
        for chunk in &file.chunks {
            record_chunk(chunk, chunk_truth);
        }
    }
    for patch in parsed.patch_entries() {
        for chunk in &patch.chunks {
            record_chunk(chunk, chunk_truth);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galaxy_mirror::MirrorTree;
    use rgog_pack::PackOptions;
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

    /// Builds a one-build, one-chunk mirror and packs it, returning the
    /// archive's path alongside the mirror root it was packed from.
    fn fixture_archive() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let chunk_bytes = b"verify me end to end";
        let chunk_md5 = md5_of(chunk_bytes);
        write_store_chunk(root, "42", &chunk_md5, chunk_bytes);

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
                "depots": [{"productId": "42", "languages": ["en-US"], "manifest": manifest_hash}]
            }),
        );

        let out = root.join("fixture.rgog");
        rgog_pack::pack(root, &out, &PackOptions::new(42)).unwrap();
        (dir, out)
    }

    #[test]
    fn clean_archive_verifies_with_no_mismatches() {
        let (_dir, archive) = fixture_archive();
        let report = verify(&archive, &VerifyOptions::default()).unwrap();
        assert!(report.ok(), "{:?}", report.mismatches);
        assert_eq!(report.builds_checked, 1);
        assert_eq!(report.manifests_checked, 1);
        assert_eq!(report.chunks_checked, 1);
    }

    #[test]
    fn full_verify_checks_uncompressed_identity_too() {
        let (_dir, archive) = fixture_archive();
        let opts = VerifyOptions { full: true, ..VerifyOptions::default() };
        let report = verify(&archive, &opts).unwrap();
        assert!(report.ok(), "{:?}", report.mismatches);
    }

    #[test]
    fn corrupted_chunk_bytes_are_reported_without_stopping_the_scan() {
        let (_dir, archive) = fixture_archive();
        let header_len = rgog_format::HEADER_SIZE;
        let mut bytes = std::fs::read(&archive).unwrap();
        let corrupt_at = (header_len as usize + 4096).min(bytes.len() - 1);
        bytes[corrupt_at] ^= 0xff;
        std::fs::write(&archive, bytes).unwrap();

        let report = verify(&archive, &VerifyOptions::default()).unwrap();
        assert!(!report.ok());
        assert_eq!(report.chunks_checked, 1);
    }

    #[test]
    fn missing_archive_is_an_io_error() {
        let (_dir, archive) = fixture_archive();
        let missing = archive.parent().unwrap().join("does_not_exist.rgog");
        let err = verify(&missing, &VerifyOptions::default()).unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}
