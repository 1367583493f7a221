//! The 128-byte RGOG header (spec.md §3, §6).

use crate::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};
use tracing::trace;

/// Magic signature for an RGOG file.
pub const RGOG_MAGIC: &[u8; 4] = b"RGOG";

/// Current on-disk format version.
pub const RGOG_VERSION: u16 = 1;

/// Size in bytes of every section in an RGOG file; every section begins at a
/// multiple of this value.
pub const SECTION_ALIGNMENT: u64 = 64;

/// Total size in bytes of the fixed header.
pub const HEADER_SIZE: u64 = 128;

/// Rounds `pos` up to the next multiple of `alignment`.
pub fn align_to(pos: u64, alignment: u64) -> u64 {
    let remainder = pos % alignment;
    if remainder == 0 {
        pos
    } else {
        pos + (alignment - remainder)
    }
}

/// Whether an archive holds full builds (`Base`) or only depot diffs (`Patch`).
/// The spec only ever produces `Base` archives; `Patch` is reserved for a
/// downstream xdelta3 patch archive, which is out of this core's scope (spec §1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArchiveType {
    Base = 1,
    Patch = 2,
}

impl ArchiveType {
    fn from_u8(value: u8) -> Self {
        match value {
            2 => ArchiveType::Patch,
            _ => ArchiveType::Base,
        }
    }
}

/// Byte offset and size of one section within a part file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionDescriptor {
    pub offset: u64,
    pub size: u64,
}

/// The five sections every part's header describes, in on-disk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sections {
    pub product_metadata: SectionDescriptor,
    pub build_metadata: SectionDescriptor,
    pub build_files: SectionDescriptor,
    pub chunk_metadata: SectionDescriptor,
    pub chunk_files: SectionDescriptor,
}

/// The fixed 128-byte header at the start of every RGOG part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgogHeader {
    pub version: u16,
    pub archive_type: ArchiveType,
    pub part_number: u32,
    pub total_parts: u32,
    /// Archive-wide build count; zero in parts other than part 0.
    pub total_builds: u16,
    /// Archive-wide chunk count, summed across every part.
    pub total_chunks: u32,
    /// Number of chunks stored in this part alone.
    pub local_chunks: u32,
    pub sections: Sections,
}

impl RgogHeader {
    /// A zero-valued header, used as a placeholder written before the real
    /// section offsets are known (spec §4.8 step 5a).
    pub fn placeholder() -> Self {
        Self {
            version: RGOG_VERSION,
            archive_type: ArchiveType::Base,
            part_number: 0,
            total_parts: 1,
            total_builds: 0,
            total_chunks: 0,
            local_chunks: 0,
            sections: Sections::default(),
        }
    }

    /// Reads and validates a header, checking the magic bytes.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != RGOG_MAGIC {
            return Err(Error::InvalidMagic {
                expected: *RGOG_MAGIC,
                actual: magic,
            });
        }

        let version = reader.read_u16::<LittleEndian>()?;
        let archive_type = ArchiveType::from_u8(reader.read_u8()?);
        let _reserved = reader.read_u8()?;
        let part_number = reader.read_u32::<LittleEndian>()?;
        let total_parts = reader.read_u32::<LittleEndian>()?;
        let total_builds = reader.read_u16::<LittleEndian>()?;
        let total_chunks = reader.read_u32::<LittleEndian>()?;
        let local_chunks = reader.read_u32::<LittleEndian>()?;

        let mut read_section = |reader: &mut R| -> Result<SectionDescriptor> {
            Ok(SectionDescriptor {
                offset: reader.read_u64::<LittleEndian>()?,
                size: reader.read_u64::<LittleEndian>()?,
            })
        };
        let sections = Sections {
            product_metadata: read_section(reader)?,
            build_metadata: read_section(reader)?,
            build_files: read_section(reader)?,
            chunk_metadata: read_section(reader)?,
            chunk_files: read_section(reader)?,
        };

        // Consume the trailing zero-padding out to HEADER_SIZE.
        let consumed = 4 + 2 + 1 + 1 + 4 + 4 + 2 + 4 + 4 + 5 * 16;
        let mut padding = vec![0u8; (HEADER_SIZE as usize) - consumed];
        reader.read_exact(&mut padding)?;

        trace!(part = part_number, version, "read RGOG header");

        Ok(Self {
            version,
            archive_type,
            part_number,
            total_parts,
            total_builds,
            total_chunks,
            local_chunks,
            sections,
        })
    }

    /// Writes the header, zero-padded to exactly [`HEADER_SIZE`] bytes.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(RGOG_MAGIC)?;
        writer.write_u16::<LittleEndian>(self.version)?;
        writer.write_u8(self.archive_type as u8)?;
        writer.write_u8(0)?;
        writer.write_u32::<LittleEndian>(self.part_number)?;
        writer.write_u32::<LittleEndian>(self.total_parts)?;
        writer.write_u16::<LittleEndian>(self.total_builds)?;
        writer.write_u32::<LittleEndian>(self.total_chunks)?;
        writer.write_u32::<LittleEndian>(self.local_chunks)?;

        let mut write_section = |writer: &mut W, section: SectionDescriptor| -> Result<()> {
            writer.write_u64::<LittleEndian>(section.offset)?;
            writer.write_u64::<LittleEndian>(section.size)?;
            Ok(())
        };
        write_section(writer, self.sections.product_metadata)?;
        write_section(writer, self.sections.build_metadata)?;
        write_section(writer, self.sections.build_files)?;
        write_section(writer, self.sections.chunk_metadata)?;
        write_section(writer, self.sections.chunk_files)?;

        let consumed = 4 + 2 + 1 + 1 + 4 + 4 + 2 + 4 + 4 + 5 * 16;
        let padding = vec![0u8; (HEADER_SIZE as usize) - consumed];
        writer.write_all(&padding)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_round_trips() {
        let mut header = RgogHeader::placeholder();
        header.part_number = 2;
        header.total_parts = 3;
        header.total_builds = 5;
        header.total_chunks = 1000;
        header.local_chunks = 200;
        header.sections.chunk_metadata = SectionDescriptor { offset: 128, size: 6400 };

        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE as usize);

        let parsed = RgogHeader::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = vec![0u8; HEADER_SIZE as usize];
        buf[0..4].copy_from_slice(b"XXXX");
        let err = RgogHeader::read(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, Error::InvalidMagic { .. }));
    }

    #[test]
    fn align_to_rounds_up_to_next_boundary() {
        assert_eq!(align_to(0, 64), 0);
        assert_eq!(align_to(1, 64), 64);
        assert_eq!(align_to(64, 64), 64);
        assert_eq!(align_to(65, 64), 128);
    }
}
