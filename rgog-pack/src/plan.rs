//! Part planning: the running byte-budget algorithm (spec.md §4.8 step 4).

use rgog_format::{CHUNK_METADATA_RECORD_SIZE, HEADER_SIZE};
use std::path::PathBuf;

/// The default maximum size of one RGOG part, before it is closed and a new
/// part started.
pub const DEFAULT_MAX_PART_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// One unique chunk to be packed, already resolved to an on-disk source file.
#[derive(Debug, Clone)]
pub struct PlannedChunk {
    pub compressed_md5: String,
    pub size: u64,
    pub source_path: PathBuf,
}

/// Splits `chunks` into parts, returning each part as the list of chunk
/// indices it carries, in order. Always produces at least one part, even for
/// an empty chunk list (spec §8 Boundary Behavior: "empty build set produces
/// ... one part").
///
/// `first_part_overhead` must already include the header plus ProductMetadata
/// and BuildMetadata section sizes (spec §4.8 step 4); every subsequent part's
/// overhead is just [`HEADER_SIZE`]. A single chunk is never split across
/// parts, even if its cost alone exceeds `max_part_size`.
pub fn plan_parts(chunks: &[PlannedChunk], first_part_overhead: u64, max_part_size: u64) -> Vec<Vec<usize>> {
    let mut parts: Vec<Vec<usize>> = vec![Vec::new()];
    let mut budget_used = first_part_overhead;

    for (index, chunk) in chunks.iter().enumerate() {
        let cost = CHUNK_METADATA_RECORD_SIZE + chunk.size;
        if !parts.last().expect("at least one part always present").is_empty() && budget_used + cost > max_part_size {
            parts.push(Vec::new());
            budget_used = HEADER_SIZE;
        }
        parts.last_mut().expect("at least one part always present").push(index);
        budget_used += cost;
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(md5: &str, size: u64) -> PlannedChunk {
        PlannedChunk {
            compressed_md5: md5.to_string(),
            size,
            source_path: PathBuf::new(),
        }
    }

    #[test]
    fn empty_input_still_yields_one_part() {
        let parts = plan_parts(&[], HEADER_SIZE, DEFAULT_MAX_PART_SIZE);
        assert_eq!(parts, vec![Vec::<usize>::new()]);
    }

    #[test]
    fn chunks_fitting_budget_stay_in_one_part() {
        let chunks = vec![chunk("a", 100), chunk("b", 200)];
        let parts = plan_parts(&chunks, HEADER_SIZE, DEFAULT_MAX_PART_SIZE);
        assert_eq!(parts, vec![vec![0, 1]]);
    }

    #[test]
    fn oversized_chunk_still_gets_its_own_part() {
        let chunks = vec![chunk("a", 1000)];
        let parts = plan_parts(&chunks, HEADER_SIZE, 10);
        assert_eq!(parts, vec![vec![0]]);
    }

    #[test]
    fn budget_overflow_starts_a_new_part() {
        // first_part_overhead=0, max=100; each chunk costs 32+40=72.
        let chunks = vec![chunk("a", 40), chunk("b", 40), chunk("c", 40)];
        let parts = plan_parts(&chunks, 0, 100);
        assert_eq!(parts, vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn subsequent_parts_use_header_only_overhead() {
        // first part overhead is huge so chunk 0 alone fills it; chunk 1
        // should still fit in part 1 because its overhead resets to header-only.
        let chunks = vec![chunk("a", 40), chunk("b", 40)];
        let parts = plan_parts(&chunks, 100 - 32 - 40, 100);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], vec![0]);
        assert_eq!(parts[1], vec![1]);
    }
}
