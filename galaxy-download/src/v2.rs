//! V2 content-addressed chunk fetch and item assembly (spec §4.5).

use crate::{Error, Result};
use bytes::Bytes;
use galaxy_hash::{galaxy_path, md5_hex_bytes, ProgressSink};
use galaxy_manifest::{Chunk, DepotFile};
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, AsyncSeekExt};
use tracing::{debug, warn};

/// Default number of concurrent chunk-fetch workers.
pub const DEFAULT_WORKERS: usize = 4;

fn build_chunk_url(template: &str, compressed_md5: &str) -> String {
    template.replace("{GALAXY_PATH}", &galaxy_path(compressed_md5))
}

fn inflate(bytes: &[u8], context: &str) -> Result<Vec<u8>> {
    let mut decoder = flate2::read::ZlibDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(|e| Error::DecompressionFailed {
        what: context.to_string(),
        reason: e.to_string(),
    })?;
    Ok(out)
}

/// Fetches and verifies a single V2 chunk, trying each CDN URL template in order.
///
/// Each candidate must return exactly `compressed_size` bytes whose MD5 equals
/// `compressed_md5`; a mismatch on any CDN moves to the next one rather than
/// failing immediately. On success, if `compressed_size != uncompressed_size` the
/// bytes are inflated (15-bit window) and the inflated bytes are returned;
/// otherwise the compressed bytes are already the content.
pub async fn fetch_v2_chunk(
    session: &galaxy_http::Session,
    chunk: &Chunk,
    cdn_templates: &[String],
) -> Result<Bytes> {
    for template in cdn_templates {
        let url = build_chunk_url(template, &chunk.compressed_md5);
        let bytes = match session.get_bytes(&url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("chunk {} fetch from {} failed: {}", chunk.compressed_md5, url, e);
                continue;
            }
        };

        if bytes.len() as u64 != chunk.compressed_size {
            warn!(
                "chunk {} from {} had size {} (expected {}), trying next CDN",
                chunk.compressed_md5,
                url,
                bytes.len(),
                chunk.compressed_size
            );
            continue;
        }

        let actual = md5_hex_bytes(&bytes);
        if actual != chunk.compressed_md5.to_lowercase() {
            warn!(
                "chunk {} from {} hashed to {}, trying next CDN",
                chunk.compressed_md5, url, actual
            );
            continue;
        }

        if chunk.compressed_size != chunk.uncompressed_size {
            let inflated = inflate(&bytes, &chunk.compressed_md5)?;
            return Ok(Bytes::from(inflated));
        }
        return Ok(bytes);
    }

    Err(Error::ChunkFetchFailed {
        hash: chunk.compressed_md5.clone(),
    })
}

/// Assembly mode for [`assemble_item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssembleMode {
    /// Chunks are fetched, decompressed, and concatenated directly to `out_path`.
    Assembled,
    /// Each compressed chunk is written to a sibling directory with a
    /// `chunks.json` sidecar; [`assemble_raw_chunks`] turns these into a final
    /// file in a later step.
    Raw,
}

/// Sidecar record describing one chunk written in `Raw` mode.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct RawChunkRecord {
    pub compressed_md5: String,
    pub file_name: String,
}

/// Assembles one V2 item (a `DepotFile`'s owned chunk list) into `out_path`.
pub async fn assemble_item(
    session: &galaxy_http::Session,
    item: &DepotFile,
    cdn_templates: &[String],
    out_path: &Path,
    mode: AssembleMode,
    workers: usize,
    progress: Option<Arc<dyn ProgressSink>>,
) -> Result<()> {
    if let Some(parent) = out_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    match mode {
        AssembleMode::Assembled => assemble_concatenated(session, item, cdn_templates, out_path, workers, progress).await,
        AssembleMode::Raw => assemble_raw(session, item, cdn_templates, out_path, workers, progress).await,
    }
}

async fn assemble_concatenated(
    session: &galaxy_http::Session,
    item: &DepotFile,
    cdn_templates: &[String],
    out_path: &Path,
    workers: usize,
    progress: Option<Arc<dyn ProgressSink>>,
) -> Result<()> {
    let total = item.chunks.len() as u64;
    let done = Arc::new(AtomicU64::new(0));
    let semaphore = Arc::new(tokio::sync::Semaphore::new(workers.max(1)));

    let mut tasks = tokio::task::JoinSet::new();
    for (index, chunk) in item.chunks.iter().cloned().enumerate() {
        let semaphore = semaphore.clone();
        let cdn_templates = cdn_templates.to_vec();
        let done = done.clone();
        let progress = progress.clone();
        let session = session.clone();
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
            let bytes = fetch_v2_chunk(&session, &chunk, &cdn_templates).await?;
            let completed = done.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(sink) = &progress {
                sink.on_progress(completed, total);
            }
            Ok::<(usize, Bytes), Error>((index, bytes))
        });
    }

    let mut slots: Vec<Option<Bytes>> = vec![None; item.chunks.len()];
    while let Some(result) = tasks.join_next().await {
        let (index, bytes) = result.expect("chunk task panicked")?;
        slots[index] = Some(bytes);
    }

    let mut file = tokio::fs::File::create(out_path).await?;
    for slot in slots {
        let bytes = slot.expect("every chunk index was scheduled exactly once");
        file.write_all(&bytes).await?;
    }
    file.flush().await?;
    Ok(())
}

async fn assemble_raw(
    session: &galaxy_http::Session,
    item: &DepotFile,
    cdn_templates: &[String],
    out_path: &Path,
    workers: usize,
    progress: Option<Arc<dyn ProgressSink>>,
) -> Result<()> {
    let chunks_dir = out_path.with_extension("chunks");
    tokio::fs::create_dir_all(&chunks_dir).await?;

    let total = item.chunks.len() as u64;
    let done = Arc::new(AtomicU64::new(0));
    let semaphore = Arc::new(tokio::sync::Semaphore::new(workers.max(1)));
    let mut tasks = tokio::task::JoinSet::new();

    for (index, chunk) in item.chunks.iter().cloned().enumerate() {
        let semaphore = semaphore.clone();
        let cdn_templates = cdn_templates.to_vec();
        let chunks_dir = chunks_dir.clone();
        let done = done.clone();
        let progress = progress.clone();
        let session = session.clone();
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
            // Raw mode writes the still-compressed bytes verbatim, so reuse the
            // fetch's verification but skip the inflate step by asking for them
            // the same way a compressed-size-equals-uncompressed-size chunk is
            // already returned as-is.
            let bytes = fetch_v2_chunk_compressed(&session, &chunk, &cdn_templates).await?;
            let file_name = format!("{index:08}_{}", chunk.compressed_md5);
            tokio::fs::write(chunks_dir.join(&file_name), &bytes).await?;
            let completed = done.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(sink) = &progress {
                sink.on_progress(completed, total);
            }
            Ok::<(usize, RawChunkRecord), Error>((
                index,
                RawChunkRecord {
                    compressed_md5: chunk.compressed_md5,
                    file_name,
                },
            ))
        });
    }

    let mut records: Vec<Option<RawChunkRecord>> = vec![None; item.chunks.len()];
    while let Some(result) = tasks.join_next().await {
        let (index, record) = result.expect("chunk task panicked")?;
        records[index] = Some(record);
    }
    let records: Vec<RawChunkRecord> = records.into_iter().map(|r| r.expect("every index scheduled")).collect();

    let sidecar = serde_json::to_vec_pretty(&records).expect("RawChunkRecord always serializes");
    tokio::fs::write(chunks_dir.join("chunks.json"), sidecar).await?;
    Ok(())
}

/// Fetches a chunk's bytes without ever inflating them — used by raw-mode
/// assembly and by the mirror archiver, both of which store compressed bytes
/// verbatim (spec §3: `store/` is content-addressed by `compressed_md5`).
pub async fn fetch_v2_chunk_compressed(
    session: &galaxy_http::Session,
    chunk: &Chunk,
    cdn_templates: &[String],
) -> Result<Bytes> {
    for template in cdn_templates {
        let url = build_chunk_url(template, &chunk.compressed_md5);
        let Ok(bytes) = session.get_bytes(&url).await else {
            continue;
        };
        if bytes.len() as u64 != chunk.compressed_size {
            continue;
        }
        if md5_hex_bytes(&bytes) != chunk.compressed_md5.to_lowercase() {
            continue;
        }
        return Ok(bytes);
    }
    Err(Error::ChunkFetchFailed {
        hash: chunk.compressed_md5.clone(),
    })
}

/// Turns a raw-mode chunks directory (see [`AssembleMode::Raw`]) into the final
/// assembled file, in index order, inflating each chunk as it is concatenated.
pub async fn assemble_raw_chunks(chunks_dir: &Path, out_path: &Path) -> Result<()> {
    let sidecar = tokio::fs::read(chunks_dir.join("chunks.json")).await?;
    let records: Vec<RawChunkRecord> = serde_json::from_slice(&sidecar).map_err(|e| Error::DecompressionFailed {
        what: "chunks.json".to_string(),
        reason: e.to_string(),
    })?;

    if let Some(parent) = out_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut out = tokio::fs::File::create(out_path).await?;
    out.seek(std::io::SeekFrom::Start(0)).await?;
    for record in &records {
        let bytes = tokio::fs::read(chunks_dir.join(&record.file_name)).await?;
        // Compressed chunks are written verbatim in raw mode; inflate unless the
        // bytes are already the uncompressed content (single-byte-length chunks
        // with equal compressed/uncompressed size never hit the zlib path).
        let payload = if galaxy_hash::is_zlib_wrapped(&bytes) {
            inflate(&bytes, &record.compressed_md5)?
        } else {
            bytes
        };
        out.write_all(&payload).await?;
    }
    out.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_chunk_url_substitutes_galaxy_path() {
        let url = build_chunk_url("https://cdn/content/{GALAXY_PATH}", "0030af763e1a09ab307d84a24d0066a2");
        assert_eq!(url, "https://cdn/content/00/30/0030af763e1a09ab307d84a24d0066a2");
    }
}
