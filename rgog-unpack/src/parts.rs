//! Multi-part discovery and section reading (spec.md §4.9, §6).
//!
//! Grounded on `casc-storage::archive::archive_reader::ArchiveReader`'s
//! open-and-read-sections idiom, adapted to RGOG's fixed-layout records
//! instead of a CASC archive's variable block index.

use crate::{Error, Result};
use rgog_format::{BuildMetadataRecord, ChunkMetadataRecord, ProductMetadata, RgogHeader};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Builds the on-disk path of part `index` (0-based), matching whichever of
/// the two accepted naming conventions (spec §6) `part_zero` itself uses.
fn part_path_for_index(part_zero: &Path, index: u32) -> PathBuf {
    let parent = part_zero.parent().unwrap_or_else(|| Path::new(""));
    let file_name = part_zero.file_name().and_then(|n| n.to_str()).unwrap_or_default();

    if let Some(stem) = file_name.strip_suffix("_1.rgog") {
        return parent.join(format!("{stem}_{}.rgog", index + 1));
    }

    let stem = file_name.strip_suffix(".rgog").unwrap_or(file_name);
    if index == 0 {
        parent.join(format!("{stem}.rgog"))
    } else {
        parent.join(format!("{stem}.part{}.rgog", index + 1))
    }
}

/// Locates every part file of the archive `path` belongs to, auto-redirecting
/// to part 0 by filename convention first (spec §4.9 step 1). Returns the
/// paths in part-number order; `paths[0]` always exists because it was opened
/// to learn `total_parts`.
pub fn discover_parts(path: &Path) -> Result<Vec<PathBuf>> {
    let part_zero = rgog_format::part_zero_path(path);
    let mut file = File::open(&part_zero)?;
    let header = RgogHeader::read(&mut file)?;

    let stem = part_zero.display().to_string();
    let mut paths = Vec::with_capacity(header.total_parts.max(1) as usize);
    for index in 0..header.total_parts.max(1) {
        let candidate = if index == 0 {
            part_zero.clone()
        } else {
            part_path_for_index(&part_zero, index)
        };
        if !candidate.is_file() {
            return Err(Error::PartNotFound { stem: stem.clone(), index });
        }
        paths.push(candidate);
    }
    Ok(paths)
}

/// The decoded metadata of one part: its header, plus (for part 0 only) the
/// product/build metadata sections, plus this part's local chunk records.
#[derive(Debug)]
pub struct PartContents {
    pub header: RgogHeader,
    pub product_metadata: Option<ProductMetadata>,
    pub builds: Vec<BuildMetadataRecord>,
    pub chunks: Vec<ChunkMetadataRecord>,
}

/// Opens `path` and reads its header and metadata sections (not the chunk or
/// build file payload bytes, which callers read on demand by offset).
pub fn read_part(path: &Path) -> Result<PartContents> {
    let mut file = File::open(path)?;
    let header = RgogHeader::read(&mut file)?;

    let mut product_metadata = None;
    let mut builds = Vec::new();
    if header.part_number == 0 {
        if header.sections.product_metadata.size > 0 {
            file.seek(SeekFrom::Start(header.sections.product_metadata.offset))?;
            product_metadata = Some(ProductMetadata::read(&mut file)?);
        }
        if header.total_builds > 0 {
            file.seek(SeekFrom::Start(header.sections.build_metadata.offset))?;
            for _ in 0..header.total_builds {
                builds.push(BuildMetadataRecord::read(&mut file)?);
            }
        }
    }

    let mut chunks = Vec::with_capacity(header.local_chunks as usize);
    if header.local_chunks > 0 {
        file.seek(SeekFrom::Start(header.sections.chunk_metadata.offset))?;
        for _ in 0..header.local_chunks {
            chunks.push(ChunkMetadataRecord::read(&mut file)?);
        }
    }

    Ok(PartContents {
        header,
        product_metadata,
        builds,
        chunks,
    })
}

/// Reads `size` bytes at absolute offset `offset` from `path`.
pub fn read_at(path: &Path, offset: u64, size: u64) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; size as usize];
    file.read_exact(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_convention_builds_next_index() {
        let part_zero = Path::new("/mirrors/game_1.rgog");
        assert_eq!(part_path_for_index(part_zero, 1), PathBuf::from("/mirrors/game_2.rgog"));
        assert_eq!(part_path_for_index(part_zero, 0), PathBuf::from("/mirrors/game_1.rgog"));
    }

    #[test]
    fn suffix_convention_builds_partn() {
        let part_zero = Path::new("/mirrors/game.rgog");
        assert_eq!(part_path_for_index(part_zero, 0), PathBuf::from("/mirrors/game.rgog"));
        assert_eq!(part_path_for_index(part_zero, 1), PathBuf::from("/mirrors/game.part2.rgog"));
    }
}
