//! V2 manifest parsing (spec §4.4).

use crate::parse_v1::normalize_path;
use crate::types::{Chunk, DepotFile, ItemV2, ManifestV2, PatchEntry, SfcRef};
use crate::{Error, Result};
use serde_json::Value;

fn parse_chunk(value: &Value) -> Result<Chunk> {
    serde_json::from_value(value.clone()).map_err(Error::from)
}

fn parse_chunks(value: &Value, context: &'static str) -> Result<Vec<Chunk>> {
    let array = value.as_array().ok_or(Error::MissingField {
        context,
        field: "chunks",
    })?;
    array.iter().map(parse_chunk).collect()
}

fn field_str<'a>(value: &'a Value, field: &'static str, context: &'static str) -> Result<&'a str> {
    value.get(field).and_then(Value::as_str).ok_or(Error::MissingField { context, field })
}

/// Parses one `DepotFile` item.
///
/// A single-chunk file whose `md5` field is missing inherits
/// `md5 = chunk.uncompressed_md5` (spec §4.4).
fn parse_depot_file(value: &Value) -> Result<DepotFile> {
    let path = normalize_path(field_str(value, "path", "v2 depot file")?);
    let size = value.get("size").and_then(Value::as_u64).unwrap_or(0);
    let sha256 = value.get("sha256").and_then(Value::as_str).map(str::to_lowercase);

    let sfc_ref = value.get("sfcRef").map(|sfc| -> Result<SfcRef> {
        Ok(SfcRef {
            offset: sfc.get("offset").and_then(Value::as_u64).ok_or(Error::MissingField {
                context: "sfcRef",
                field: "offset",
            })?,
            size: sfc.get("size").and_then(Value::as_u64).ok_or(Error::MissingField {
                context: "sfcRef",
                field: "size",
            })?,
        })
    }).transpose()?;

    let chunks = match value.get("chunks") {
        Some(chunks_value) => parse_chunks(chunks_value, "v2 depot file")?,
        None => Vec::new(),
    };

    let mut md5 = value.get("md5").and_then(Value::as_str).map(str::to_lowercase);
    if md5.is_none() {
        if let [only] = chunks.as_slice() {
            md5 = Some(only.uncompressed_md5.to_lowercase());
        }
    }

    // §9 ambiguity (c): prefer SFC extraction when both sfcRef and chunks are
    // present; the regular chunk list becomes an optional fallback.
    let has_sfc_fallback = sfc_ref.is_some() && !chunks.is_empty();

    Ok(DepotFile {
        path,
        size,
        md5,
        sha256,
        chunks,
        sfc_ref,
        has_sfc_fallback,
    })
}

fn parse_patch_diff(value: &Value) -> Result<PatchEntry> {
    Ok(PatchEntry {
        source_path: normalize_path(field_str(value, "sourcePath", "v2 depot diff")?),
        target_path: normalize_path(field_str(value, "targetPath", "v2 depot diff")?),
        md5_source: field_str(value, "md5Source", "v2 depot diff")?.to_lowercase(),
        md5_target: field_str(value, "md5Target", "v2 depot diff")?.to_lowercase(),
        md5: field_str(value, "md5", "v2 depot diff")?.to_lowercase(),
        chunks: parse_chunks(
            value.get("chunks").ok_or(Error::MissingField {
                context: "v2 depot diff",
                field: "chunks",
            })?,
            "v2 depot diff",
        )?,
    })
}

/// Parses a decompressed V2 manifest document's `depot.items[]` array, plus a
/// top-level `smallFilesContainer` if present.
pub fn parse_v2_manifest(document: &Value) -> Result<ManifestV2> {
    let items_json = document
        .get("depot")
        .and_then(|d| d.get("items"))
        .and_then(Value::as_array)
        .ok_or(Error::MissingField {
            context: "v2 manifest",
            field: "depot.items",
        })?;

    let mut items = Vec::with_capacity(items_json.len());
    for record in items_json {
        let item_type = field_str(record, "type", "v2 manifest item")?;
        match item_type {
            "DepotFile" => items.push(ItemV2::DepotFile(parse_depot_file(record)?)),
            "DepotDiff" => items.push(ItemV2::DepotDiff(parse_patch_diff(record)?)),
            other => {
                tracing::warn!("unrecognized v2 manifest item type: {other}");
            }
        }
    }

    let sfc = document
        .get("depot")
        .and_then(|d| d.get("smallFilesContainer"))
        .map(|sfc_value| -> Result<DepotFile> {
            Ok(DepotFile {
                path: "__sfc__".to_string(),
                size: sfc_value.get("size").and_then(Value::as_u64).unwrap_or(0),
                md5: sfc_value.get("md5").and_then(Value::as_str).map(str::to_lowercase),
                sha256: None,
                chunks: parse_chunks(
                    sfc_value.get("chunks").ok_or(Error::MissingField {
                        context: "smallFilesContainer",
                        field: "chunks",
                    })?,
                    "smallFilesContainer",
                )?,
                sfc_ref: None,
                has_sfc_fallback: false,
            })
        })
        .transpose()?;

    Ok(ManifestV2 { items, sfc })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chunk(md5: &str) -> Value {
        json!({
            "compressed_md5": md5,
            "compressed_size": 100,
            "uncompressed_md5": md5,
            "uncompressed_size": 200
        })
    }

    #[test]
    fn single_chunk_file_inherits_md5() {
        let document = json!({
            "depot": {
                "items": [{
                    "type": "DepotFile",
                    "path": "data/a.bin",
                    "size": 200,
                    "chunks": [chunk("abc123")]
                }]
            }
        });
        let manifest = parse_v2_manifest(&document).unwrap();
        let file = manifest.depot_files().next().unwrap();
        assert_eq!(file.md5.as_deref(), Some("abc123"));
    }

    #[test]
    fn sfc_ref_marks_chunks_as_fallback() {
        let document = json!({
            "depot": {
                "items": [{
                    "type": "DepotFile",
                    "path": "small.txt",
                    "size": 10,
                    "sfcRef": {"offset": 4096, "size": 256},
                    "chunks": [chunk("deadbeef")]
                }]
            }
        });
        let manifest = parse_v2_manifest(&document).unwrap();
        let file = manifest.depot_files().next().unwrap();
        assert!(file.sfc_ref.is_some());
        assert!(file.has_sfc_fallback);
    }

    #[test]
    fn depot_diff_parses_into_patch_entry() {
        let document = json!({
            "depot": {
                "items": [{
                    "type": "DepotDiff",
                    "sourcePath": "a.bin",
                    "targetPath": "a.bin",
                    "md5Source": "AAA",
                    "md5Target": "BBB",
                    "md5": "CCC",
                    "chunks": [chunk("patchchunk")]
                }]
            }
        });
        let manifest = parse_v2_manifest(&document).unwrap();
        let patch = manifest.patch_entries().next().unwrap();
        assert_eq!(patch.md5_source, "aaa");
        assert_eq!(patch.chunks.len(), 1);
    }

    #[test]
    fn top_level_sfc_becomes_synthetic_item() {
        let document = json!({
            "depot": {
                "items": [],
                "smallFilesContainer": {
                    "size": 1024,
                    "chunks": [chunk("sfcchunk")]
                }
            }
        });
        let manifest = parse_v2_manifest(&document).unwrap();
        assert!(manifest.sfc.is_some());
        assert_eq!(manifest.depot_files().count(), 1);
    }
}
