//! Bulk depot download orchestration (spec §4.5 "V2 item assembly" / bulk
//! primitive).
//!
//! Ordered as the spec requires: SFC items first, then every item that
//! extracts from an already-downloaded SFC via `sfcRef`, then (optionally) the
//! SFC files are deleted, and finally the remaining regular items.

use crate::v2::{assemble_item, fetch_v2_chunk, AssembleMode};
use crate::{Error, Result};
use galaxy_hash::ProgressSink;
use galaxy_manifest::{DepotFile, ManifestV2};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default number of concurrent chunk-fetch workers, shared with [`crate::v2`].
pub const DEFAULT_WORKERS: usize = crate::v2::DEFAULT_WORKERS;

/// Tunables for [`download_depot`].
#[derive(Debug, Clone)]
pub struct DepotDownloadOptions {
    /// Concurrent chunk-fetch workers per item.
    pub workers: usize,
    /// Delete the SFC's own output file(s) once every `sfcRef` item has been
    /// extracted from it.
    pub delete_sfc_after_extraction: bool,
    /// Verify each regular item's final MD5 after assembly, when known.
    pub verify_md5: bool,
}

impl Default for DepotDownloadOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            delete_sfc_after_extraction: false,
            verify_md5: true,
        }
    }
}

/// Aggregate outcome of a bulk depot download; never fails fast on a single
/// item (spec §7) — per-item failures are accumulated here instead.
#[derive(Debug, Clone, Default)]
pub struct DepotDownloadStats {
    pub downloaded: u64,
    pub skipped: u64,
    pub failed: u64,
    /// First few failure descriptors, for a human-readable summary (spec §7).
    pub failures: Vec<String>,
}

impl DepotDownloadStats {
    fn record_failure(&mut self, path: &str, err: &Error) {
        self.failed += 1;
        if self.failures.len() < 10 {
            self.failures.push(format!("{path}: {err}"));
        }
    }
}

fn is_non_transient_http_status(err: &Error) -> bool {
    matches!(err, Error::Transport(galaxy_http::Error::Status { .. }))
}

/// Downloads every file in a V2 manifest into `out_dir`, ordered per spec
/// §4.5: SFC items, then `sfcRef` extraction, then (optionally) SFC deletion,
/// then remaining regular items.
pub async fn download_depot(
    session: &galaxy_http::Session,
    manifest: &ManifestV2,
    cdn_templates: &[String],
    out_dir: &Path,
    opts: &DepotDownloadOptions,
    progress: Option<Arc<dyn ProgressSink>>,
) -> Result<DepotDownloadStats> {
    let mut stats = DepotDownloadStats::default();

    // Step (a): download every SFC item (synthetic top-level SFC plus any
    // DepotFile that owns chunks but is itself referenced via sfcRef by others
    // — in practice the synthetic SFC is the only such item).
    let mut sfc_bytes: Option<Vec<u8>> = None;
    if let Some(sfc) = &manifest.sfc {
        match download_sfc_bytes(session, sfc, cdn_templates, opts.workers).await {
            Ok(bytes) => {
                stats.downloaded += 1;
                sfc_bytes = Some(bytes);
            }
            Err(err) => {
                stats.record_failure("__sfc__", &err);
            }
        }
    }

    // Step (b): extract every sfcRef-bearing item from the buffer.
    let mut extracted_paths = Vec::new();
    for file in manifest.depot_files() {
        let Some(sfc_ref) = &file.sfc_ref else { continue };
        let Some(buffer) = &sfc_bytes else {
            stats.record_failure(
                &file.path,
                &Error::SfcOutOfBounds {
                    offset: sfc_ref.offset,
                    size: sfc_ref.size,
                    buffer_len: 0,
                },
            );
            continue;
        };
        match crate::sfc::extract_sfc(sfc_ref, buffer) {
            Ok(bytes) => {
                let out_path = out_dir.join(&file.path);
                if let Some(parent) = out_path.parent() {
                    if let Err(e) = tokio::fs::create_dir_all(parent).await {
                        stats.record_failure(&file.path, &Error::Io(e));
                        continue;
                    }
                }
                if let Err(e) = tokio::fs::write(&out_path, &bytes).await {
                    stats.record_failure(&file.path, &Error::Io(e));
                    continue;
                }
                stats.downloaded += 1;
                extracted_paths.push(out_path);
            }
            Err(err) => stats.record_failure(&file.path, &err),
        }
    }

    // Step (c): optionally delete the SFC's own materialized file, if one was
    // ever written out separately from the in-memory buffer used above.
    if opts.delete_sfc_after_extraction {
        if let Some(sfc) = &manifest.sfc {
            let sfc_out_path = out_dir.join(&sfc.path);
            let _ = tokio::fs::remove_file(&sfc_out_path).await;
        }
    }

    // Step (d): download remaining regular items (no sfcRef).
    for file in manifest.depot_files() {
        if file.sfc_ref.is_some() {
            continue;
        }
        if file.path == "__sfc__" {
            continue;
        }
        let out_path = out_dir.join(&file.path);
        let expected_md5 = if opts.verify_md5 { file.md5.as_deref() } else { None };
        match assemble_item(
            session,
            file,
            cdn_templates,
            &out_path,
            AssembleMode::Assembled,
            opts.workers,
            progress.clone(),
        )
        .await
        {
            Ok(()) => {
                if let Some(expected) = expected_md5 {
                    if let Err(err) = verify_file_md5(&out_path, expected).await {
                        stats.record_failure(&file.path, &err);
                        continue;
                    }
                }
                stats.downloaded += 1;
            }
            Err(err) => {
                if file.has_sfc_fallback && is_non_transient_http_status(&err) {
                    debug!("item {} has sfc fallback, reclassifying failure as skipped", file.path);
                    stats.skipped += 1;
                } else {
                    warn!("failed to download {}: {}", file.path, err);
                    stats.record_failure(&file.path, &err);
                }
            }
        }
    }

    Ok(stats)
}

async fn download_sfc_bytes(
    session: &galaxy_http::Session,
    sfc: &DepotFile,
    cdn_templates: &[String],
    workers: usize,
) -> Result<Vec<u8>> {
    let semaphore = Arc::new(tokio::sync::Semaphore::new(workers.max(1)));
    let mut tasks = tokio::task::JoinSet::new();
    for (index, chunk) in sfc.chunks.iter().cloned().enumerate() {
        let semaphore = semaphore.clone();
        let cdn_templates = cdn_templates.to_vec();
        let session = session.clone();
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
            let bytes = fetch_v2_chunk(&session, &chunk, &cdn_templates).await?;
            Ok::<(usize, bytes::Bytes), Error>((index, bytes))
        });
    }

    let mut slots: Vec<Option<bytes::Bytes>> = vec![None; sfc.chunks.len()];
    while let Some(result) = tasks.join_next().await {
        let (index, bytes) = result.expect("sfc chunk task panicked")?;
        slots[index] = Some(bytes);
    }

    let mut out = Vec::new();
    for slot in slots {
        out.extend_from_slice(&slot.expect("every sfc chunk index was scheduled exactly once"));
    }
    Ok(out)
}

async fn verify_file_md5(path: &Path, expected: &str) -> Result<()> {
    let file = std::fs::File::open(path)?;
    let size = file.metadata()?.len();
    let actual = galaxy_hash::md5_hex_stream(file, size, None)?;
    if actual != expected.to_lowercase() {
        let _ = tokio::fs::remove_file(path).await;
        return Err(Error::HashMismatch {
            what: path.display().to_string(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

/// Absolute path `out_dir` would place a V2 item's content at, before it is
/// downloaded. Exposed for callers (e.g. the mirror archiver) that need to
/// check whether an item was already extracted.
pub fn item_output_path(out_dir: &Path, file: &DepotFile) -> PathBuf {
    out_dir.join(&file.path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_output_path_joins_out_dir_and_relative_path() {
        let file = DepotFile {
            path: "data/a.bin".to_string(),
            size: 0,
            md5: None,
            sha256: None,
            chunks: vec![],
            sfc_ref: None,
            has_sfc_fallback: false,
        };
        let out = item_output_path(Path::new("/mirror"), &file);
        assert_eq!(out, PathBuf::from("/mirror/data/a.bin"));
    }
}
