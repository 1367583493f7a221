//! Restores a mirror tree from an RGOG archive (spec.md §4.9).
//!
//! Repository and manifest bytes are restored verbatim (still zlib-wrapped);
//! chunk extraction fans out across a worker pool sized to CPU count by
//! default, each task keyed on its chunk's absolute offset within its part so
//! no two tasks ever touch the same byte range — the same
//! no-in-flight-coordination-needed property the download engine's chunk
//! fetch relies on (spec §4.5 "Concurrency discipline"), adapted here from
//! `casc-storage::cache::lockfree_cache`'s sharded-by-key pattern: the "key"
//! sharding tasks is each chunk's offset rather than a cache slot.

use crate::parts::{discover_parts, read_at, read_part};
use crate::{Error, Result};
use galaxy_mirror::MirrorTree;
use rgog_format::ChunkMetadataRecord;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info};

/// Options controlling one unpack run.
#[derive(Debug, Clone)]
pub struct UnpackOptions {
    /// Also write decompressed pretty-printed copies under `debug/`.
    pub write_debug: bool,
    /// Number of concurrent chunk-extraction workers.
    pub workers: usize,
}

impl Default for UnpackOptions {
    fn default() -> Self {
        Self {
            write_debug: true,
            workers: std::thread::available_parallelism().map(std::num::NonZeroUsize::get).unwrap_or(4),
        }
    }
}

/// Aggregate outcome of one unpack run.
#[derive(Debug, Clone, Default)]
pub struct UnpackReport {
    pub builds_restored: u64,
    pub manifests_restored: u64,
    pub chunks_restored: u64,
    pub warnings: Vec<String>,
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

fn write_debug_copy(path: &Path, bytes: &[u8]) -> Result<()> {
    let document = galaxy_mirror::decode_bytes(bytes)?;
    let pretty = serde_json::to_vec_pretty(&document)?;
    write_file(path, &pretty)
}

/// Restores every build's repository and manifest bytes from part 0, plus
/// (optionally) their decompressed debug copies. Chunks are handled
/// separately by [`restore_chunks`] since they may span every part.
fn restore_builds(part0_path: &Path, tree: &MirrorTree, opts: &UnpackOptions, report: &mut UnpackReport) -> Result<()> {
    let part0 = read_part(part0_path)?;
    let build_files_offset = part0.header.sections.build_files.offset;

    for build in &part0.builds {
        report.builds_restored += 1;
        let repo_hash = hex::encode(build.repository_id);
        let repo_bytes = read_at(part0_path, build_files_offset + build.repo_offset, build.repo_size)?;
        write_file(&tree.v2_meta_path(&repo_hash), &repo_bytes)?;
        if opts.write_debug {
            if let Err(err) = write_debug_copy(&tree.v2_debug_depot_path(&repo_hash), &repo_bytes) {
                report.warnings.push(format!("build {}: debug copy of repository {repo_hash} failed: {err}", build.build_id));
            }
        }

        for manifest in &build.manifests {
            report.manifests_restored += 1;
            let manifest_hash = hex::encode(manifest.depot_id);
            let manifest_bytes = read_at(part0_path, build_files_offset + manifest.offset, manifest.size)?;
            write_file(&tree.v2_meta_path(&manifest_hash), &manifest_bytes)?;
            if opts.write_debug {
                if let Err(err) = write_debug_copy(&tree.v2_debug_manifest_path(&manifest_hash), &manifest_bytes) {
                    report.warnings.push(format!("build {}: debug copy of manifest {manifest_hash} failed: {err}", build.build_id));
                }
            }
        }
    }

    Ok(())
}

/// Extracts every chunk in `chunks` (all from the same part, at
/// `chunk_files_offset`) to `v2/store/<product_id>/aa/bb/<hash>`, fanning the
/// reads and writes out across `opts.workers` concurrent tasks.
async fn restore_chunks(
    part_path: &Path,
    chunk_files_offset: u64,
    chunks: &[ChunkMetadataRecord],
    tree: &MirrorTree,
    product_id: &str,
    opts: &UnpackOptions,
) -> Result<u64> {
    let total = chunks.len() as u64;
    let done = Arc::new(AtomicU64::new(0));
    let semaphore = Arc::new(tokio::sync::Semaphore::new(opts.workers.max(1)));
    let mut tasks = tokio::task::JoinSet::new();

    for chunk in chunks {
        let semaphore = semaphore.clone();
        let part_path = part_path.to_path_buf();
        let store_path = tree.v2_store_path(product_id, &hex::encode(chunk.compressed_md5));
        let offset = chunk_files_offset + chunk.offset;
        let size = chunk.size;
        let done = done.clone();

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
            let mut file = tokio::fs::File::open(&part_path).await?;
            file.seek(std::io::SeekFrom::Start(offset)).await?;
            let mut bytes = vec![0u8; size as usize];
            file.read_exact(&mut bytes).await?;

            if let Some(parent) = store_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let mut out = tokio::fs::File::create(&store_path).await?;
            out.write_all(&bytes).await?;
            out.flush().await?;

            done.fetch_add(1, Ordering::SeqCst);
            Ok::<(), Error>(())
        });
    }

    while let Some(result) = tasks.join_next().await {
        result.expect("chunk extraction task panicked")?;
    }

    Ok(done.load(Ordering::SeqCst).min(total))
}

/// Restores `path`'s archive into a mirror tree rooted at `out_root`,
/// auto-redirecting to part 0 by filename convention first.
pub async fn unpack(path: &Path, out_root: &Path, opts: &UnpackOptions) -> Result<UnpackReport> {
    let part_paths = discover_parts(path)?;
    let tree = MirrorTree::new(out_root);
    let mut report = UnpackReport::default();

    restore_builds(&part_paths[0], &tree, opts, &mut report)?;

    let part0 = read_part(&part_paths[0])?;
    let product_id = part0
        .product_metadata
        .as_ref()
        .map(|p| p.product_id.to_string())
        .unwrap_or_else(|| "0".to_string());

    for (index, part_path) in part_paths.iter().enumerate() {
        let contents = if index == 0 { &part0 } else { &read_part(part_path)? };
        let chunk_files_offset = contents.header.sections.chunk_files.offset;
        debug!("extracting {} chunks from part {}", contents.chunks.len(), index);
        let restored = restore_chunks(part_path, chunk_files_offset, &contents.chunks, &tree, &product_id, opts).await?;
        report.chunks_restored += restored;
    }

    info!(
        "unpacked {} builds, {} manifests, {} chunks to {}",
        report.builds_restored,
        report.manifests_restored,
        report.chunks_restored,
        out_root.display()
    );
    Ok(report)
}

/// Part paths of the archive `path` belongs to, in order, for callers (e.g.
/// the CLI's `extract`) that want to report them without a full unpack.
pub fn list_parts(path: &Path) -> Result<Vec<PathBuf>> {
    discover_parts(path)
}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[tokio::test]
    async fn unpacks_builds_manifests_and_chunks_back_to_a_mirror_tree() {
        let source_dir = tempdir().unwrap();
        let source_root = source_dir.path();

        let chunk_bytes = b"round trip me";
        let chunk_md5 = md5_of(chunk_bytes);
        write_store_chunk(source_root, "7", &chunk_md5, chunk_bytes);

        let manifest_hash = "22222222222222222222222222222222";
        write_meta(
            source_root,
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
        let repository_hash = "11111111111111111111111111111111";
        write_meta(
            source_root,
            repository_hash,
            &serde_json::json!({
                "buildId": "9",
                "depots": [{"productId": "7", "languages": ["en-US"], "manifest": manifest_hash}]
            }),
        );

        let archive = source_root.join("fixture.rgog");
        let pack_report = rgog_pack::pack(source_root, &archive, &PackOptions::new(7)).unwrap();
        assert_eq!(pack_report.total_chunks, 1);

        let restore_dir = tempdir().unwrap();
        let restore_root = restore_dir.path();
        let report = unpack(&archive, restore_root, &UnpackOptions::default()).await.unwrap();

        assert_eq!(report.builds_restored, 1);
        assert_eq!(report.manifests_restored, 1);
        assert_eq!(report.chunks_restored, 1);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);

        let tree = MirrorTree::new(restore_root);
        assert_eq!(std::fs::read(tree.v2_meta_path(repository_hash)).unwrap(), source_root_bytes(source_root, repository_hash));
        assert_eq!(std::fs::read(tree.v2_meta_path(manifest_hash)).unwrap(), source_root_bytes(source_root, manifest_hash));
        assert_eq!(std::fs::read(tree.v2_store_path("7", &chunk_md5)).unwrap(), chunk_bytes);

        // debug copies are pretty-printed JSON, decoded from the raw bytes
        let debug_manifest = std::fs::read(tree.v2_debug_manifest_path(manifest_hash)).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&debug_manifest).unwrap();
        assert!(parsed.get("depot").is_some());
    }

    fn source_root_bytes(root: &Path, hash: &str) -> Vec<u8> {
        std::fs::read(MirrorTree::new(root).v2_meta_path(hash)).unwrap()
    }

    #[tokio::test]
    async fn unpack_without_debug_skips_pretty_copies() {
        let source_dir = tempdir().unwrap();
        let source_root = source_dir.path();
        let manifest_hash = "33333333333333333333333333333333";
        write_meta(source_root, manifest_hash, &serde_json::json!({"depot": {"items": []}}));
        write_meta(
            source_root,
            "44444444444444444444444444444444",
            &serde_json::json!({
                "buildId": "1",
                "depots": [{"productId": "3", "languages": ["en-US"], "manifest": manifest_hash}]
            }),
        );

        let archive = source_root.join("fixture.rgog");
        rgog_pack::pack(source_root, &archive, &PackOptions::new(3)).unwrap();

        let restore_dir = tempdir().unwrap();
        let restore_root = restore_dir.path();
        let opts = UnpackOptions { write_debug: false, ..UnpackOptions::default() };
        unpack(&archive, restore_root, &opts).await.unwrap();

        let tree = MirrorTree::new(restore_root);
        assert!(!tree.v2_debug_manifest_path(manifest_hash).exists());
        assert!(tree.v2_meta_path(manifest_hash).exists());
    }
}
