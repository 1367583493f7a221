//! Mirror validator (C7, spec §4.7): walks an already-archived mirror and
//! verifies every chunk/file MD5, without touching the network.

use crate::decode::decode_bytes;
use crate::tree::MirrorTree;
use crate::Result;
use galaxy_client::{DepotDescriptorV2, Repository};
use galaxy_hash::md5_hex_stream;
use galaxy_manifest::{parse_v1_manifest, parse_v2_manifest, Chunk};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// One entry's pass/fail outcome.
#[derive(Debug, Clone)]
pub struct ValidationEntry {
    pub what: String,
    pub ok: bool,
    pub detail: Option<String>,
}

/// Aggregate validation outcome. Entries accumulate without short-circuiting
/// on the first failure (spec §4.7, §7).
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub passed: u64,
    pub failed: u64,
    pub entries: Vec<ValidationEntry>,
}

impl ValidationReport {
    fn record(&mut self, what: impl Into<String>, ok: bool, detail: Option<String>) {
        if ok {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.entries.push(ValidationEntry {
            what: what.into(),
            ok,
            detail,
        });
    }
}

/// Optional sampling parameters: sample `count` entries using `seed`.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub count: usize,
    pub seed: u64,
}

/// Validates a mirror tree without performing any network I/O.
pub struct MirrorValidator {
    tree: MirrorTree,
}

impl MirrorValidator {
    pub fn new(mirror_root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            tree: MirrorTree::new(mirror_root),
        }
    }

    fn read_local_document(&self, path: &Path) -> Result<serde_json::Value> {
        let bytes = std::fs::read(path)?;
        decode_bytes(&bytes)
    }

    /// Validates a V1 build by loading `repository.json`, every referenced
    /// manifest, and (optionally sampled) seek-and-stream MD5 of each file
    /// entry against `main.bin`, sorted by offset for sequential I/O.
    pub fn validate_v1_sample(
        &self,
        product_id: &str,
        platform: &str,
        timestamp: &str,
        sample: Option<Sample>,
    ) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();

        let repo_path = self.tree.v1_repository_path(product_id, platform, timestamp);
        let repo_document = self.read_local_document(&repo_path)?;
        let repository: Repository = serde_json::from_value(repo_document)?;

        let mut entries = Vec::new();
        for depot in &repository.depots {
            let manifest_path = self.tree.v1_manifest_path(product_id, platform, timestamp, &depot.manifest);
            let manifest_document = match self.read_local_document(&manifest_path) {
                Ok(doc) => doc,
                Err(err) => {
                    report.record(depot.manifest.clone(), false, Some(err.to_string()));
                    continue;
                }
            };
            match parse_v1_manifest(&manifest_document) {
                Ok(manifest) => entries.extend(manifest.files),
                Err(err) => report.record(depot.manifest.clone(), false, Some(err.to_string())),
            }
        }

        if let Some(sample) = sample {
            let mut rng = rand::rngs::StdRng::seed_from_u64(sample.seed);
            entries.shuffle(&mut rng);
            entries.truncate(sample.count);
        }

        // Sort by offset for sequential disk I/O (spec §4.7).
        entries.sort_by_key(|e| e.offset);

        let main_bin_path = self.tree.v1_main_bin_path(product_id, platform, timestamp);
        let mut file = match std::fs::File::open(&main_bin_path) {
            Ok(file) => file,
            Err(err) => {
                report.record("main.bin", false, Some(err.to_string()));
                return Ok(report);
            }
        };

        for entry in entries {
            if let Err(err) = file.seek(SeekFrom::Start(entry.offset)) {
                report.record(entry.path.clone(), false, Some(err.to_string()));
                continue;
            }
            let mut limited = (&mut file).take(entry.size);
            let actual = match md5_hex_stream(&mut limited, entry.size, None) {
                Ok(hash) => hash,
                Err(err) => {
                    report.record(entry.path.clone(), false, Some(err.to_string()));
                    continue;
                }
            };
            if actual == entry.md5.to_lowercase() {
                report.record(entry.path, true, None);
            } else {
                report.record(
                    entry.path,
                    false,
                    Some(format!("expected {}, got {actual}", entry.md5)),
                );
            }
        }

        Ok(report)
    }

    /// Validates every unique chunk referenced by a V2 depot descriptor's
    /// manifests: length, compressed MD5, inflate success, inflated length,
    /// inflated MD5 (spec §4.7).
    pub fn validate_v2_sample(&self, product_id: &str, depot_hash: &str, sample: Option<Sample>) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();

        let depot_document = self.read_local_document(&self.tree.v2_meta_path(depot_hash))?;
        let descriptor: DepotDescriptorV2 = serde_json::from_value(depot_document)?;

        let mut chunks: HashMap<String, Chunk> = HashMap::new();
        for depot_ref in &descriptor.depots {
            let manifest_document = match self.read_local_document(&self.tree.v2_meta_path(&depot_ref.manifest)) {
                Ok(doc) => doc,
                Err(err) => {
                    report.record(depot_ref.manifest.clone(), false, Some(err.to_string()));
                    continue;
                }
            };
            match parse_v2_manifest(&manifest_document) {
                Ok(manifest) => {
                    for file in manifest.depot_files() {
                        for chunk in &file.chunks {
                            chunks.entry(chunk.compressed_md5.clone()).or_insert_with(|| chunk.clone());
                        }
                    }
                }
                Err(err) => report.record(depot_ref.manifest.clone(), false, Some(err.to_string())),
            }
        }

        let mut chunk_list: Vec<Chunk> = chunks.into_values().collect();
        chunk_list.sort_by(|a, b| a.compressed_md5.cmp(&b.compressed_md5));

        if let Some(sample) = sample {
            let mut rng = rand::rngs::StdRng::seed_from_u64(sample.seed);
            chunk_list.shuffle(&mut rng);
            chunk_list.truncate(sample.count);
        }

        for chunk in chunk_list {
            self.validate_one_chunk(product_id, &chunk, &mut report);
        }

        Ok(report)
    }

    fn validate_one_chunk(&self, product_id: &str, chunk: &Chunk, report: &mut ValidationReport) {
        let store_path = self.tree.v2_store_path(product_id, &chunk.compressed_md5);
        let bytes = match std::fs::read(&store_path) {
            Ok(bytes) => bytes,
            Err(err) => {
                report.record(chunk.compressed_md5.clone(), false, Some(err.to_string()));
                return;
            }
        };

        if bytes.len() as u64 != chunk.compressed_size {
            report.record(
                chunk.compressed_md5.clone(),
                false,
                Some(format!("size {} != expected {}", bytes.len(), chunk.compressed_size)),
            );
            return;
        }

        let actual_compressed = galaxy_hash::md5_hex_bytes(&bytes);
        if actual_compressed != chunk.compressed_md5.to_lowercase() {
            report.record(
                chunk.compressed_md5.clone(),
                false,
                Some(format!("compressed md5 mismatch: got {actual_compressed}")),
            );
            return;
        }

        let inflated = if chunk.compressed_size != chunk.uncompressed_size {
            let mut decoder = flate2::read::ZlibDecoder::new(bytes.as_slice());
            let mut out = Vec::new();
            match decoder.read_to_end(&mut out) {
                Ok(_) => out,
                Err(err) => {
                    report.record(chunk.compressed_md5.clone(), false, Some(format!("inflate failed: {err}")));
                    return;
                }
            }
        } else {
            bytes
        };

        if inflated.len() as u64 != chunk.uncompressed_size {
            report.record(
                chunk.compressed_md5.clone(),
                false,
                Some(format!("inflated size {} != expected {}", inflated.len(), chunk.uncompressed_size)),
            );
            return;
        }

        let actual_uncompressed = galaxy_hash::md5_hex_bytes(&inflated);
        if actual_uncompressed != chunk.uncompressed_md5.to_lowercase() {
            report.record(
                chunk.compressed_md5.clone(),
                false,
                Some(format!("uncompressed md5 mismatch: got {actual_uncompressed}")),
            );
            return;
        }

        report.record(chunk.compressed_md5.clone(), true, None);
    }
}
