//! Mirror archiver (C6, spec §4.6): faithfully reproduces the platform's CDN
//! layout on disk for a single build.

use crate::tree::MirrorTree;
use crate::{Error, Result};
use galaxy_client::{ContentSystemClient, DepotDescriptorV2, Platform, Repository};
use galaxy_download::fetch_v2_chunk_compressed;
use galaxy_manifest::{parse_v1_manifest, parse_v2_manifest, Chunk};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Aggregate outcome of one archiving run. Never fails fast on a single
/// file/chunk (spec §7) — per-item failures are accumulated here instead.
#[derive(Debug, Clone, Default)]
pub struct ArchiveStats {
    pub downloaded: u64,
    pub skipped: u64,
    pub failed: u64,
    /// First few failure descriptors, for a human-readable summary.
    pub failures: Vec<String>,
}

impl ArchiveStats {
    fn record_failure(&mut self, what: &str, err: &Error) {
        self.failed += 1;
        if self.failures.len() < 10 {
            self.failures.push(format!("{what}: {err}"));
        }
    }
}

/// A chunk discovered while walking a V2 build's manifests, annotated with
/// the flags the archiver needs to decide whether a download failure is
/// reportable or just "skipped" (spec §4.6, §9 ambiguity (c)).
#[derive(Debug, Clone)]
struct ChunkRecord {
    chunk: Chunk,
    has_sfc_fallback: bool,
}

/// Writes a faithful on-disk CDN mirror for one build.
pub struct MirrorWriter<'a> {
    client: &'a ContentSystemClient,
    tree: MirrorTree,
}

impl<'a> MirrorWriter<'a> {
    pub fn new(client: &'a ContentSystemClient, mirror_root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            client,
            tree: MirrorTree::new(mirror_root),
        }
    }

    pub fn tree(&self) -> &MirrorTree {
        &self.tree
    }

    async fn write_meta_and_debug(&self, hash: &str, debug_path: &std::path::Path) -> Result<serde_json::Value> {
        let raw = self.client.fetch_v2_meta_raw(hash).await?;
        let meta_path = self.tree.v2_meta_path(hash);
        if let Some(parent) = meta_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&meta_path, &raw).await?;

        let document = self.client.decode_document(hash, &raw)?;
        if let Some(parent) = debug_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let pretty = serde_json::to_vec_pretty(&document)?;
        tokio::fs::write(debug_path, pretty).await?;
        Ok(document)
    }

    /// Archives a V2 build rooted at depot descriptor `identifier` (spec §4.6
    /// steps 1-4).
    pub async fn archive_v2_build(&self, product_id: &str, identifier: &str) -> Result<ArchiveStats> {
        let mut stats = ArchiveStats::default();

        let debug_depot_path = self.tree.v2_debug_depot_path(identifier);
        let document = self.write_meta_and_debug(identifier, &debug_depot_path).await?;
        let descriptor: DepotDescriptorV2 = serde_json::from_value(document)?;

        // product_id -> { compressed_md5 -> chunk }
        let mut chunk_map: HashMap<String, HashMap<String, ChunkRecord>> = HashMap::new();

        for depot_ref in &descriptor.depots {
            let debug_manifest_path = self.tree.v2_debug_manifest_path(&depot_ref.manifest);
            let manifest_document = match self.write_meta_and_debug(&depot_ref.manifest, &debug_manifest_path).await {
                Ok(doc) => doc,
                Err(err) => {
                    stats.record_failure(&depot_ref.manifest, &err);
                    continue;
                }
            };
            let manifest = match parse_v2_manifest(&manifest_document) {
                Ok(m) => m,
                Err(err) => {
                    stats.record_failure(&depot_ref.manifest, &err.into());
                    continue;
                }
            };

            let product_chunks = chunk_map.entry(depot_ref.product_id.clone()).or_default();
            for file in manifest.depot_files() {
                for chunk in &file.chunks {
                    product_chunks
                        .entry(chunk.compressed_md5.clone())
                        .or_insert_with(|| ChunkRecord {
                            chunk: chunk.clone(),
                            has_sfc_fallback: file.has_sfc_fallback,
                        });
                }
            }
        }

        // Offline depot: fetch its manifest JSON (and debug copy) but never
        // collect its chunks (spec §4.6 step 2).
        if let Some(offline) = &descriptor.offline_depot {
            let debug_manifest_path = self.tree.v2_debug_manifest_path(&offline.manifest);
            if let Err(err) = self.write_meta_and_debug(&offline.manifest, &debug_manifest_path).await {
                stats.record_failure(&offline.manifest, &err);
            }
        }

        // Secure links are per-product; cached inside the client across every
        // chunk in this product's map.
        for (product_id, chunks) in chunk_map {
            let link = self.client.get_secure_link(&product_id, "/", 2, &[]).await?;
            let mut sorted: Vec<_> = chunks.into_values().collect();
            sorted.sort_by(|a, b| a.chunk.compressed_md5.cmp(&b.chunk.compressed_md5));

            for record in sorted {
                let store_path = self.tree.v2_store_path(&product_id, &record.chunk.compressed_md5);
                if store_path.exists() {
                    stats.skipped += 1;
                    continue;
                }
                match self.download_chunk_with_retry(&record.chunk, &link.templates, &store_path).await {
                    Ok(()) => stats.downloaded += 1,
                    Err(err) if record.has_sfc_fallback => {
                        debug!(
                            "chunk {} has sfc fallback, reclassifying failure as skipped: {}",
                            record.chunk.compressed_md5, err
                        );
                        stats.skipped += 1;
                    }
                    Err(err) => {
                        warn!("failed to download chunk {}: {}", record.chunk.compressed_md5, err);
                        stats.record_failure(&record.chunk.compressed_md5, &err);
                    }
                }
            }
        }

        info!(
            "archived v2 build {}: {} downloaded, {} skipped, {} failed",
            identifier, stats.downloaded, stats.skipped, stats.failed
        );
        Ok(stats)
    }

    /// Retries a transient chunk-fetch failure up to 3 times with exponential
    /// backoff (1s, 2s, 4s), per spec §4.6 step 4.
    async fn download_chunk_with_retry(
        &self,
        chunk: &Chunk,
        cdn_templates: &[String],
        store_path: &std::path::Path,
    ) -> Result<()> {
        let mut backoff = Duration::from_secs(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match fetch_v2_chunk_compressed(self.client.session(), chunk, cdn_templates).await {
                Ok(bytes) => {
                    if let Some(parent) = store_path.parent() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                    tokio::fs::write(store_path, &bytes).await?;
                    return Ok(());
                }
                Err(err) if attempt < 3 => {
                    warn!(
                        "chunk {} fetch failed (attempt {}), retrying after {:?}: {}",
                        chunk.compressed_md5, attempt, backoff, err
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Archives a V1 build, auto-detecting the platform by probing
    /// `{windows, mac, linux}` in turn if `platform` is `None` (spec §4.6 step 5).
    pub async fn archive_v1_build(
        &self,
        product_id: &str,
        identifier: &str,
        platform: Option<Platform>,
    ) -> Result<ArchiveStats> {
        let mut stats = ArchiveStats::default();

        let (platform, raw_repo) = match platform {
            Some(platform) => {
                let raw = self.client.fetch_v1_repository_raw(product_id, platform, identifier).await?;
                (platform, raw)
            }
            None => self.detect_platform(product_id, identifier).await?,
        };

        let repo_path = self.tree.v1_repository_path(product_id, platform.as_path_segment(), identifier);
        if let Some(parent) = repo_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&repo_path, &raw_repo).await?;

        let document: serde_json::Value = self.client.decode_document("repository.json", &raw_repo)?;
        let repository: Repository = serde_json::from_value(document)?;

        for depot in &repository.depots {
            match self
                .client
                .fetch_v1_manifest_raw(product_id, platform, identifier, &depot.manifest)
                .await
            {
                Ok(raw_manifest) => {
                    let manifest_path =
                        self.tree.v1_manifest_path(product_id, platform.as_path_segment(), identifier, &depot.manifest);
                    if let Some(parent) = manifest_path.parent() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                    if let Err(err) = tokio::fs::write(&manifest_path, &raw_manifest).await {
                        stats.record_failure(&depot.manifest, &err.into());
                        continue;
                    }
                    if let Ok(document) = self.client.decode_document(&depot.manifest, &raw_manifest) {
                        if let Err(err) = parse_v1_manifest(&document) {
                            stats.record_failure(&depot.manifest, &err.into());
                            continue;
                        }
                    }
                    stats.downloaded += 1;
                }
                Err(err) => stats.record_failure(&depot.manifest, &err.into()),
            }
        }

        let path_segment = format!("/{}/{}/", platform.as_path_segment(), identifier);
        let link = self.client.get_secure_link(product_id, &path_segment, 1, &[]).await?;
        let base = link.templates.first().ok_or_else(|| {
            galaxy_client::Error::NoUsableEndpoint {
                path: path_segment.clone(),
            }
        })?;
        let blob_url = format!("{}main.bin", base.trim_end_matches("{GALAXY_PATH}"));
        let main_bin_path = self.tree.v1_main_bin_path(product_id, platform.as_path_segment(), identifier);
        if let Some(parent) = main_bin_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        match galaxy_download::download_v1_blob(
            self.client.session(),
            &blob_url,
            &main_bin_path,
            None,
            galaxy_download::DEFAULT_SUB_RANGE_SIZE,
            galaxy_download::V1_DEFAULT_WORKERS,
            None,
            None,
        )
        .await
        {
            Ok(()) => stats.downloaded += 1,
            Err(err) => stats.record_failure("main.bin", &err.into()),
        }

        info!(
            "archived v1 build {} ({}): {} downloaded, {} skipped, {} failed",
            identifier,
            platform.as_path_segment(),
            stats.downloaded,
            stats.skipped,
            stats.failed
        );
        Ok(stats)
    }

    async fn detect_platform(&self, product_id: &str, identifier: &str) -> Result<(Platform, bytes::Bytes)> {
        for platform in Platform::ALL {
            if let Ok(raw) = self.client.fetch_v1_repository_raw(product_id, platform, identifier).await {
                debug!("detected platform {:?} for build {}", platform, identifier);
                return Ok((platform, raw));
            }
        }
        Err(Error::PlatformNotDetected {
            identifier: identifier.to_string(),
        })
    }
}
