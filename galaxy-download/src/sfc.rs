//! Small-files container (SFC) extraction (spec §4.5).

use crate::{Error, Result};
use galaxy_manifest::SfcRef;

/// Extracts the byte range named by `sfc_ref` out of an already-downloaded,
/// decompressed SFC buffer.
///
/// `offset + size == len(buffer)` is valid (the extracted range ends exactly at
/// the buffer's end); `offset + size > len(buffer)` by even one byte is
/// `SfcOutOfBounds`.
pub fn extract_sfc(sfc_ref: &SfcRef, buffer: &[u8]) -> Result<Vec<u8>> {
    let end = sfc_ref
        .offset
        .checked_add(sfc_ref.size)
        .ok_or(Error::SfcOutOfBounds {
            offset: sfc_ref.offset,
            size: sfc_ref.size,
            buffer_len: buffer.len() as u64,
        })?;

    if end > buffer.len() as u64 {
        return Err(Error::SfcOutOfBounds {
            offset: sfc_ref.offset,
            size: sfc_ref.size,
            buffer_len: buffer.len() as u64,
        });
    }

    Ok(buffer[sfc_ref.offset as usize..end as usize].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_exact_range() {
        let buffer: Vec<u8> = (0u8..=255).cycle().take(1024 * 1024).collect();
        let sfc_ref = SfcRef { offset: 4096, size: 256 };
        let extracted = extract_sfc(&sfc_ref, &buffer).unwrap();
        assert_eq!(extracted, &buffer[4096..4352]);
    }

    #[test]
    fn exactly_at_end_is_valid() {
        let buffer = vec![0u8; 100];
        let sfc_ref = SfcRef { offset: 50, size: 50 };
        assert!(extract_sfc(&sfc_ref, &buffer).is_ok());
    }

    #[test]
    fn one_byte_past_end_is_out_of_bounds() {
        let buffer = vec![0u8; 100];
        let sfc_ref = SfcRef { offset: 50, size: 51 };
        let err = extract_sfc(&sfc_ref, &buffer).unwrap_err();
        assert!(matches!(err, Error::SfcOutOfBounds { .. }));
    }
}
