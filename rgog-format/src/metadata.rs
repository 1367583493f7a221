//! Metadata record layouts (spec.md §3, §6): `ProductMetadata`,
//! `BuildMetadataRecord`/`ManifestMetadataRecord`, `ChunkMetadataRecord`.

use crate::header::align_to;
use crate::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Size in bytes of one [`ChunkMetadataRecord`] on disk: `16 + 8 + 8`.
pub const CHUNK_METADATA_RECORD_SIZE: u64 = 32;

/// Size in bytes of one [`ManifestMetadataRecord`] on disk: `16 + 8 + 8 + 8 + 8`.
pub const MANIFEST_METADATA_RECORD_SIZE: u64 = 48;

/// Size in bytes of a [`BuildMetadataRecord`]'s fixed prefix, excluding its
/// variable-length `manifests` array.
pub const BUILD_METADATA_FIXED_SIZE: u64 = 8 + 1 + 3 + 16 + 8 + 8 + 2 + 2;

/// The operating system a build targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OsCode {
    Null = 0,
    Windows = 1,
    Mac = 2,
    Linux = 3,
}

impl OsCode {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => OsCode::Windows,
            2 => OsCode::Mac,
            3 => OsCode::Linux,
            _ => OsCode::Null,
        }
    }

    pub fn from_platform_segment(segment: &str) -> Self {
        match segment {
            "windows" => OsCode::Windows,
            "osx" | "mac" => OsCode::Mac,
            "linux" => OsCode::Linux,
            _ => OsCode::Null,
        }
    }
}

/// The product-level metadata section: one record, always at the start of
/// part 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductMetadata {
    pub product_id: u64,
    pub name: String,
}

impl ProductMetadata {
    /// Size this record occupies on disk, zero-padded to an 8-byte boundary.
    pub fn encoded_size(&self) -> u64 {
        align_to(8 + 4 + self.name.len() as u64, 8)
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u64::<LittleEndian>(self.product_id)?;
        writer.write_u32::<LittleEndian>(self.name.len() as u32)?;
        writer.write_all(self.name.as_bytes())?;
        let padded = align_to(8 + 4 + self.name.len() as u64, 8);
        let padding = padded - (8 + 4 + self.name.len() as u64);
        writer.write_all(&vec![0u8; padding as usize])?;
        Ok(())
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let product_id = reader.read_u64::<LittleEndian>()?;
        let name_len = reader.read_u32::<LittleEndian>()?;
        let mut name_bytes = vec![0u8; name_len as usize];
        reader.read_exact(&mut name_bytes)?;
        let name = String::from_utf8(name_bytes).map_err(|_| Error::InvalidUtf8 { field: "name" })?;
        let padded = align_to(8 + 4 + u64::from(name_len), 8);
        let padding = padded - (8 + 4 + u64::from(name_len));
        let mut pad_buf = vec![0u8; padding as usize];
        reader.read_exact(&mut pad_buf)?;
        Ok(Self { product_id, name })
    }
}

/// One depot manifest's metadata within a build, with a 128-bit language
/// bitset split into `lang_lo`/`lang_hi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestMetadataRecord {
    pub depot_id: [u8; 16],
    pub offset: u64,
    pub size: u64,
    pub languages_lo: u64,
    pub languages_hi: u64,
}

impl ManifestMetadataRecord {
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.depot_id)?;
        writer.write_u64::<LittleEndian>(self.offset)?;
        writer.write_u64::<LittleEndian>(self.size)?;
        writer.write_u64::<LittleEndian>(self.languages_lo)?;
        writer.write_u64::<LittleEndian>(self.languages_hi)?;
        Ok(())
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut depot_id = [0u8; 16];
        reader.read_exact(&mut depot_id)?;
        let offset = reader.read_u64::<LittleEndian>()?;
        let size = reader.read_u64::<LittleEndian>()?;
        let languages_lo = reader.read_u64::<LittleEndian>()?;
        let languages_hi = reader.read_u64::<LittleEndian>()?;
        Ok(Self {
            depot_id,
            offset,
            size,
            languages_lo,
            languages_hi,
        })
    }
}

/// One build's metadata: its repository coordinates plus every depot
/// manifest it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildMetadataRecord {
    pub build_id: u64,
    pub os: OsCode,
    pub repository_id: [u8; 16],
    pub repo_offset: u64,
    pub repo_size: u64,
    pub manifests: Vec<ManifestMetadataRecord>,
}

impl BuildMetadataRecord {
    /// Total encoded size including the variable-length manifest array.
    pub fn encoded_size(&self) -> u64 {
        BUILD_METADATA_FIXED_SIZE + self.manifests.len() as u64 * MANIFEST_METADATA_RECORD_SIZE
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u64::<LittleEndian>(self.build_id)?;
        writer.write_u8(self.os as u8)?;
        writer.write_all(&[0u8; 3])?;
        writer.write_all(&self.repository_id)?;
        writer.write_u64::<LittleEndian>(self.repo_offset)?;
        writer.write_u64::<LittleEndian>(self.repo_size)?;
        writer.write_u16::<LittleEndian>(self.manifests.len() as u16)?;
        writer.write_all(&[0u8; 2])?;
        for manifest in &self.manifests {
            manifest.write(writer)?;
        }
        Ok(())
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let build_id = reader.read_u64::<LittleEndian>()?;
        let os = OsCode::from_u8(reader.read_u8()?);
        let mut pad = [0u8; 3];
        reader.read_exact(&mut pad)?;
        let mut repository_id = [0u8; 16];
        reader.read_exact(&mut repository_id)?;
        let repo_offset = reader.read_u64::<LittleEndian>()?;
        let repo_size = reader.read_u64::<LittleEndian>()?;
        let manifest_count = reader.read_u16::<LittleEndian>()?;
        let mut pad2 = [0u8; 2];
        reader.read_exact(&mut pad2)?;
        let manifests = (0..manifest_count)
            .map(|_| ManifestMetadataRecord::read(reader))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            build_id,
            os,
            repository_id,
            repo_offset,
            repo_size,
            manifests,
        })
    }
}

/// One content-addressed chunk's location within a part's `ChunkFiles`
/// section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkMetadataRecord {
    pub compressed_md5: [u8; 16],
    pub offset: u64,
    pub size: u64,
}

impl ChunkMetadataRecord {
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.compressed_md5)?;
        writer.write_u64::<LittleEndian>(self.offset)?;
        writer.write_u64::<LittleEndian>(self.size)?;
        Ok(())
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut compressed_md5 = [0u8; 16];
        reader.read_exact(&mut compressed_md5)?;
        let offset = reader.read_u64::<LittleEndian>()?;
        let size = reader.read_u64::<LittleEndian>()?;
        Ok(Self {
            compressed_md5,
            offset,
            size,
        })
    }
}

/// Parses a 32-hex MD5 string into its 16-byte form.
pub fn md5_hex_to_bytes(hex_str: &str) -> Result<[u8; 16]> {
    let decoded = hex::decode(hex_str).map_err(|_| Error::InvalidUtf8 { field: "md5" })?;
    decoded.try_into().map_err(|_| Error::InvalidUtf8 { field: "md5" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn product_metadata_round_trips_and_pads_to_8_bytes() {
        let meta = ProductMetadata {
            product_id: 1207658930,
            name: "abc".to_string(),
        };
        let mut buf = Vec::new();
        meta.write(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, meta.encoded_size());
        assert_eq!(buf.len() % 8, 0);

        let parsed = ProductMetadata::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(parsed, meta);
    }

    #[test]
    fn build_metadata_round_trips_with_manifests() {
        let record = BuildMetadataRecord {
            build_id: 42,
            os: OsCode::Windows,
            repository_id: [0xAB; 16],
            repo_offset: 128,
            repo_size: 4096,
            manifests: vec![ManifestMetadataRecord {
                depot_id: [0xCD; 16],
                offset: 256,
                size: 1024,
                languages_lo: 0b11,
                languages_hi: 0,
            }],
        };
        let mut buf = Vec::new();
        record.write(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, record.encoded_size());

        let parsed = BuildMetadataRecord::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn md5_hex_to_bytes_round_trips() {
        let hash = "0030af763e1a09ab307d84a24d0066a2";
        let bytes = md5_hex_to_bytes(hash).unwrap();
        assert_eq!(hex::encode(bytes), hash);
    }
}
