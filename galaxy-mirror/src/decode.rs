//! Local (no-network) zlib-or-raw JSON decoding, for re-reading bytes the
//! archiver already wrote verbatim to disk.
//!
//! This mirrors `galaxy-client`'s decode rule (spec §4.3) but operates on
//! bytes already on disk, so the validator and packer never need a
//! `ContentSystemClient` of their own.

use crate::{Error, Result};
use galaxy_hash::is_zlib_wrapped;
use std::io::Read;

/// Inflates `body` if it is zlib-wrapped, then parses it as JSON. Falls back
/// to a raw-JSON parse if inflation fails.
pub fn decode_bytes(body: &[u8]) -> Result<serde_json::Value> {
    if is_zlib_wrapped(body) {
        let mut decoder = flate2::read::ZlibDecoder::new(body);
        let mut decompressed = Vec::new();
        if decoder.read_to_end(&mut decompressed).is_ok() {
            return serde_json::from_slice(&decompressed).map_err(Error::from);
        }
    }
    serde_json::from_slice(body).map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let value = decode_bytes(br#"{"a":1}"#).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn parses_zlib_wrapped_json() {
        use std::io::Write;
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(br#"{"a":2}"#).unwrap();
        let compressed = encoder.finish().unwrap();
        let value = decode_bytes(&compressed).unwrap();
        assert_eq!(value["a"], 2);
    }
}
