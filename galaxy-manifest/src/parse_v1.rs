//! V1 manifest parsing (spec §4.4).

use crate::types::{FileEntryV1, ManifestV1};
use crate::{Error, Result};
use serde_json::Value;

/// Parses a decompressed V1 manifest document's `depot.files[]` array.
///
/// Emits a file entry per record with `size > 0 && offset present`; size-0
/// records are directories and are dropped. `path` is normalized to forward
/// slashes with leading separators stripped.
pub fn parse_v1_manifest(document: &Value) -> Result<ManifestV1> {
    let files_json = document
        .get("depot")
        .and_then(|d| d.get("files"))
        .and_then(Value::as_array)
        .ok_or(Error::MissingField {
            context: "v1 manifest",
            field: "depot.files",
        })?;

    let mut files = Vec::with_capacity(files_json.len());
    for record in files_json {
        let size = record.get("size").and_then(Value::as_u64).unwrap_or(0);
        let Some(offset) = record.get("offset").and_then(Value::as_u64) else {
            continue;
        };
        if size == 0 {
            continue;
        }
        let path = record
            .get("path")
            .and_then(Value::as_str)
            .ok_or(Error::MissingField {
                context: "v1 file entry",
                field: "path",
            })?;
        let md5 = record
            .get("md5")
            .or_else(|| record.get("hash"))
            .and_then(Value::as_str)
            .ok_or(Error::MissingField {
                context: "v1 file entry",
                field: "md5",
            })?;

        files.push(FileEntryV1 {
            path: normalize_path(path),
            offset,
            size,
            md5: md5.to_lowercase(),
        });
    }

    Ok(ManifestV1 { files })
}

/// Normalizes a V1 path to forward slashes with leading separators stripped.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn skips_zero_size_entries() {
        let document = json!({
            "depot": {
                "files": [
                    {"path": "dir/", "offset": 0, "size": 0, "md5": "00000000000000000000000000000000"},
                    {"path": "dir/file.bin", "offset": 1024, "size": 2048, "md5": "DEADBEEFCAFEBABE0123456789ABCDEF"}
                ]
            }
        });
        let manifest = parse_v1_manifest(&document).unwrap();
        assert_eq!(manifest.files.len(), 1);
        assert_eq!(manifest.files[0].path, "dir/file.bin");
        assert_eq!(manifest.files[0].md5, "deadbeefcafebabe0123456789abcdef");
    }

    #[test]
    fn skips_entries_missing_offset() {
        let document = json!({
            "depot": {"files": [{"path": "a", "size": 10, "md5": "a"}]}
        });
        let manifest = parse_v1_manifest(&document).unwrap();
        assert!(manifest.files.is_empty());
    }

    #[test]
    fn normalizes_backslashes_and_leading_slash() {
        assert_eq!(normalize_path("\\windows\\file.bin"), "windows/file.bin");
        assert_eq!(normalize_path("/unix/file.bin"), "unix/file.bin");
    }

    #[test]
    fn missing_files_array_is_schema_error() {
        let document = json!({"depot": {}});
        assert!(parse_v1_manifest(&document).is_err());
    }
}
