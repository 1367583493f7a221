//! V1 parallel-range blob download (spec §4.5).
//!
//! V1 depots store every file concatenated into a single `main.bin` blob,
//! addressed by `(offset, size)`. A full-depot download pre-allocates the
//! output file, splits it into sub-ranges, and fetches them concurrently with
//! a bounded worker pool, writing each sub-range at its absolute offset.

use crate::{Error, Result};
use galaxy_hash::{md5_hex_stream, ProgressSink};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info};

/// Default sub-range size for a full-blob download (50 MiB).
pub const DEFAULT_SUB_RANGE_SIZE: u64 = 50 * 1024 * 1024;

/// Sub-range size used when extracting a single file out of the blob (10 MiB),
/// per spec §4.5 — smaller, since an individual file is typically far smaller
/// than the whole depot.
pub const SINGLE_FILE_SUB_RANGE_SIZE: u64 = 10 * 1024 * 1024;

/// Default number of concurrent range-fetch workers.
pub const DEFAULT_WORKERS: usize = 4;

/// One half-open `[start, end]` inclusive byte sub-range within the blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SubRange {
    start: u64,
    end: u64,
}

fn split_ranges(total_start: u64, total_end: u64, sub_range_size: u64) -> Vec<SubRange> {
    let mut ranges = Vec::new();
    let mut cursor = total_start;
    while cursor <= total_end {
        let end = (cursor + sub_range_size - 1).min(total_end);
        ranges.push(SubRange { start: cursor, end });
        cursor = end + 1;
    }
    ranges
}

/// Pre-allocates `out_path` to `size` bytes by seeking to `size - 1` and
/// writing a single zero byte, per spec §4.5 step 3. This both reserves disk
/// space up front and lets concurrent workers perform positional writes
/// without racing on file length.
async fn preallocate(out_path: &Path, size: u64) -> Result<tokio::fs::File> {
    let file = tokio::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(out_path)
        .await?;
    if size > 0 {
        file.set_len(size).await?;
    }
    Ok(file)
}

/// Downloads the byte range `range` (or the whole resource, if `None`) of a V1
/// blob from `url` into `out_path`, split into `sub_range_size`-byte chunks
/// fetched by up to `workers` concurrent tasks, each writing at its own
/// absolute offset.
///
/// If `expected_md5` is given, the assembled file is hashed on completion; a
/// mismatch deletes the file and returns [`Error::HashMismatch`] (spec §7).
#[allow(clippy::too_many_arguments)]
pub async fn download_v1_blob(
    session: &galaxy_http::Session,
    url: &str,
    out_path: &Path,
    range: Option<(u64, u64)>,
    sub_range_size: u64,
    workers: usize,
    expected_md5: Option<&str>,
    progress: Option<Arc<dyn ProgressSink>>,
) -> Result<()> {
    let (total_start, total_end) = match range {
        Some((start, end)) => (start, end),
        None => {
            let head = session.head(url).await?;
            let length = head.content_length.ok_or_else(|| Error::ChunkFetchFailed {
                hash: url.to_string(),
            })?;
            (0, length.saturating_sub(1))
        }
    };
    let total_size = total_end - total_start + 1;

    debug!(
        "downloading {} bytes from {} into {}",
        total_size,
        url,
        out_path.display()
    );

    let file = preallocate(out_path, total_size).await?;
    drop(file);

    let ranges = split_ranges(total_start, total_end, sub_range_size);
    let total_ranges = ranges.len() as u64;
    let done = Arc::new(AtomicU64::new(0));
    let semaphore = Arc::new(tokio::sync::Semaphore::new(workers.max(1)));

    let mut tasks = tokio::task::JoinSet::new();
    for sub_range in ranges {
        let semaphore = semaphore.clone();
        let session = session.clone();
        let url = url.to_string();
        let out_path = out_path.to_path_buf();
        let done = done.clone();
        let progress = progress.clone();
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
            let bytes = session.get_range(&url, sub_range.start, sub_range.end).await?;

            let mut file = tokio::fs::OpenOptions::new().write(true).open(&out_path).await?;
            file.seek(std::io::SeekFrom::Start(sub_range.start - total_start)).await?;
            file.write_all(&bytes).await?;
            file.flush().await?;

            let completed = done.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(sink) = &progress {
                sink.on_progress(completed, total_ranges);
            }
            Ok::<(), Error>(())
        });
    }

    while let Some(result) = tasks.join_next().await {
        result.expect("range task panicked")?;
    }

    if let Some(expected) = expected_md5 {
        verify_and_cleanup(out_path, expected).await?;
    }

    info!("completed download of {} bytes to {}", total_size, out_path.display());
    Ok(())
}

async fn verify_and_cleanup(out_path: &Path, expected_md5: &str) -> Result<()> {
    let file = std::fs::File::open(out_path)?;
    let size = file.metadata()?.len();
    let actual = md5_hex_stream(file, size, None)?;
    if actual != expected_md5.to_lowercase() {
        let _ = tokio::fs::remove_file(out_path).await;
        return Err(Error::HashMismatch {
            what: out_path.display().to_string(),
            expected: expected_md5.to_string(),
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_exact_multiple_into_even_ranges() {
        let ranges = split_ranges(0, 99, 25);
        assert_eq!(ranges.len(), 4);
        assert_eq!(ranges[0], SubRange { start: 0, end: 24 });
        assert_eq!(ranges[3], SubRange { start: 75, end: 99 });
    }

    #[test]
    fn splits_remainder_into_shorter_final_range() {
        let ranges = split_ranges(0, 109, 50);
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[2], SubRange { start: 100, end: 109 });
    }

    #[test]
    fn single_range_when_smaller_than_sub_range_size() {
        let ranges = split_ranges(10, 20, 1024);
        assert_eq!(ranges, vec![SubRange { start: 10, end: 20 }]);
    }

    #[test]
    fn empty_range_start_after_end_yields_no_ranges() {
        let ranges = split_ranges(5, 4, 100);
        assert!(ranges.is_empty());
    }
}
