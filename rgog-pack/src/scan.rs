//! Scans a mirror's `v2/meta/` directory and groups its depot descriptors
//! into per-build records ready for packing (spec.md §4.8 steps 1-2).
//!
//! Only V2 mirrors are supported by the packer, per spec §4.8 step 1.

use crate::Result;
use galaxy_client::DepotDescriptorV2;
use galaxy_mirror::decode_bytes;
use rgog_format::OsCode;
use std::path::Path;
use tracing::warn;

/// One depot manifest discovered while scanning a build.
#[derive(Debug, Clone)]
pub struct ScannedManifest {
    pub depot_hash: String,
    pub product_id: String,
    pub bytes: Vec<u8>,
    pub languages: Vec<String>,
    /// True for the build's `offlineDepot`: its manifest is archived, but its
    /// chunks are never collected for download or packing (spec §4.6 step 2,
    /// §4.8 step 3).
    pub is_offline: bool,
}

/// One build discovered while scanning, with its repository (depot
/// descriptor) bytes and every depot manifest it references, in the order
/// the descriptor declared them.
#[derive(Debug, Clone)]
pub struct ScannedBuild {
    pub build_id: u64,
    pub os: OsCode,
    pub repository_hash: String,
    pub repository_bytes: Vec<u8>,
    pub manifests: Vec<ScannedManifest>,
}

fn is_repository_shaped(value: &serde_json::Value) -> bool {
    value.get("depots").and_then(serde_json::Value::as_array).is_some()
}

/// Walks `<root>/v2/meta/aa/bb/<hash>` and returns `(hash, raw bytes, parsed
/// document)` for every file found. Unreadable or unparseable files are
/// skipped with a warning rather than aborting the scan (spec §7).
fn walk_meta_files(root: &Path, warnings: &mut Vec<String>) -> Result<Vec<(String, Vec<u8>, serde_json::Value)>> {
    let meta_root = root.join("v2/meta");
    let mut found = Vec::new();
    let Ok(level1) = std::fs::read_dir(&meta_root) else {
        return Ok(found);
    };
    for aa in level1.flatten() {
        if !aa.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let Ok(level2) = std::fs::read_dir(aa.path()) else {
            continue;
        };
        for bb in level2.flatten() {
            if !bb.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let Ok(entries) = std::fs::read_dir(bb.path()) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                let hash = path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
                let raw = match std::fs::read(&path) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        warnings.push(format!("{}: {err}", path.display()));
                        continue;
                    }
                };
                match decode_bytes(&raw) {
                    Ok(document) => found.push((hash, raw, document)),
                    Err(err) => warn!("skipping unparseable meta file {}: {}", path.display(), err),
                }
            }
        }
    }
    Ok(found)
}

/// Scans `mirror_root` and returns every build found, grouped and sorted
/// ascending by numeric `build_id` (spec §4.8 step 2), along with any
/// non-fatal scan warnings.
///
/// `os_hint` is applied to every build discovered: the V2 on-disk layout
/// scanned here (`v2/meta/`) carries no platform field of its own (see
/// DESIGN.md), so the caller supplies it explicitly when building a
/// single-platform archive.
pub fn scan_mirror(mirror_root: &Path, os_hint: OsCode) -> Result<(Vec<ScannedBuild>, Vec<String>)> {
    let mut warnings = Vec::new();
    let documents = walk_meta_files(mirror_root, &mut warnings)?;

    // Index every document by hash so manifest references can be resolved
    // without re-reading the directory tree.
    let mut by_hash: std::collections::HashMap<String, (Vec<u8>, serde_json::Value)> = std::collections::HashMap::new();
    for (hash, raw, document) in documents {
        by_hash.insert(hash, (raw, document));
    }

    let mut builds = Vec::new();
    for (hash, (raw, document)) in &by_hash {
        if !is_repository_shaped(document) {
            continue; // a depot manifest, not a repository/depot descriptor; ignored here (step 1)
        }
        let descriptor: DepotDescriptorV2 = match serde_json::from_value(document.clone()) {
            Ok(d) => d,
            Err(err) => {
                warnings.push(format!("{hash}: failed to parse depot descriptor: {err}"));
                continue;
            }
        };
        let Some(build_id_str) = &descriptor.build_id else {
            warnings.push(format!("{hash}: depot descriptor has no build_id, cannot group into a build"));
            continue;
        };
        let Ok(build_id) = build_id_str.parse::<u64>() else {
            warnings.push(format!("{hash}: build_id {build_id_str:?} is not numeric"));
            continue;
        };

        let mut manifests = Vec::new();
        for depot_ref in &descriptor.depots {
            let Some((manifest_raw, _)) = by_hash.get(&depot_ref.manifest) else {
                warnings.push(format!("build {build_id}: manifest {} not found on disk", depot_ref.manifest));
                continue;
            };
            manifests.push(ScannedManifest {
                depot_hash: depot_ref.manifest.clone(),
                product_id: depot_ref.product_id.clone(),
                bytes: manifest_raw.clone(),
                languages: depot_ref.languages.clone(),
                is_offline: false,
            });
        }
        if let Some(offline) = &descriptor.offline_depot {
            match by_hash.get(&offline.manifest) {
                Some((manifest_raw, _)) => manifests.push(ScannedManifest {
                    depot_hash: offline.manifest.clone(),
                    product_id: offline.product_id.clone(),
                    bytes: manifest_raw.clone(),
                    languages: offline.languages.clone(),
                    is_offline: true,
                }),
                None => warnings.push(format!(
                    "build {build_id}: offline depot manifest {} not found on disk",
                    offline.manifest
                )),
            }
        }

        builds.push(ScannedBuild {
            build_id,
            os: os_hint,
            repository_hash: hash.clone(),
            repository_bytes: raw.clone(),
            manifests,
        });
    }

    builds.sort_by_key(|b| b.build_id);
    Ok((builds, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_meta(root: &Path, hash: &str, json: &serde_json::Value) {
        let path = root.join("v2/meta").join(&hash[0..2]).join(&hash[2..4]).join(hash);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(json.to_string().as_bytes()).unwrap();
        std::fs::write(path, encoder.finish().unwrap()).unwrap();
    }

    #[test]
    fn scans_one_build_with_one_manifest() {
        let dir = tempdir().unwrap();
        let root = dir.path();

        write_meta(
            root,
            "11111111111111111111111111111111",
            &serde_json::json!({
                "buildId": "42",
                "depots": [{"productId": "1", "languages": ["en-US"], "manifest": "22222222222222222222222222222222"}]
            }),
        );
        write_meta(
            root,
            "22222222222222222222222222222222",
            &serde_json::json!({"depot": {"items": []}}),
        );

        let (builds, warnings) = scan_mirror(root, OsCode::Windows).unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].build_id, 42);
        assert_eq!(builds[0].manifests.len(), 1);
    }

    #[test]
    fn missing_manifest_is_a_warning_not_a_failure() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write_meta(
            root,
            "11111111111111111111111111111111",
            &serde_json::json!({
                "buildId": "1",
                "depots": [{"productId": "1", "languages": ["en-US"], "manifest": "deadbeefdeadbeefdeadbeefdeadbeef"}]
            }),
        );

        let (builds, warnings) = scan_mirror(root, OsCode::Null).unwrap();
        assert_eq!(builds[0].manifests.len(), 0);
        assert!(!warnings.is_empty());
    }

    #[test]
    fn depot_manifest_files_are_not_mistaken_for_builds() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write_meta(
            root,
            "33333333333333333333333333333333",
            &serde_json::json!({"depot": {"items": []}}),
        );
        let (builds, _warnings) = scan_mirror(root, OsCode::Null).unwrap();
        assert!(builds.is_empty());
    }
}
