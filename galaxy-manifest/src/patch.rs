//! Patch acquisition (spec §4.4).
//!
//! This module only flattens a patch document's `DepotDiff` items; it never
//! applies a patch (xdelta3 application is explicitly out of scope, spec §1).

use crate::types::{Manifest, PatchEntry};
use crate::{Error, Result};

/// A minimal view of a build, sufficient to decide whether patching applies.
pub struct BuildRef<'a> {
    pub manifest: &'a Manifest,
    pub build_id: Option<&'a str>,
}

/// A patch document's per-depot manifest, already parsed by the caller via
/// `galaxy-client` + this crate's V2 parser.
pub struct PatchDepotManifest<'a> {
    pub product_id: &'a str,
    pub languages: &'a [String],
    pub manifest: Manifest,
}

/// The result of a successful patch lookup: all `DepotDiff` items flattened from
/// every matching per-depot patch manifest.
pub struct Patch {
    pub files: Vec<PatchEntry>,
}

/// Decides whether `Patch::get` should even attempt a lookup: returns `None`
/// immediately if either manifest is V1 or either build lacks a `build_id`
/// (spec §4.4).
pub fn is_patchable(new: &BuildRef<'_>, old: &BuildRef<'_>) -> bool {
    matches!(new.manifest, Manifest::V2(_))
        && matches!(old.manifest, Manifest::V2(_))
        && new.build_id.is_some()
        && old.build_id.is_some()
}

/// Requires the patch root's `algorithm` to be `"xdelta3"`.
pub fn check_algorithm(algorithm: &str) -> Result<()> {
    if algorithm != "xdelta3" {
        return Err(Error::UnsupportedPatchAlgorithm(algorithm.to_string()));
    }
    Ok(())
}

/// Flattens every `DepotDiff` from the per-depot patch manifests matching
/// `(product_id ∈ {base} ∪ extra, language ∈ depot.languages)` into one list.
pub fn collect_patch_files(
    depot_manifests: &[PatchDepotManifest<'_>],
    base_product_id: &str,
    extra_product_ids: &[&str],
    language: &str,
) -> Patch {
    let mut files = Vec::new();
    for depot in depot_manifests {
        let product_matches = depot.product_id == base_product_id || extra_product_ids.contains(&depot.product_id);
        let language_matches = depot.languages.iter().any(|l| l == "*" || l == language);
        if !product_matches || !language_matches {
            continue;
        }
        if let Manifest::V2(manifest) = &depot.manifest {
            files.extend(manifest.patch_entries().cloned());
        }
    }
    Patch { files }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemV2, ManifestV1, ManifestV2};

    #[test]
    fn v1_manifests_are_never_patchable() {
        let v1 = Manifest::V1(ManifestV1::default());
        let v2 = Manifest::V2(ManifestV2::default());
        let new = BuildRef {
            manifest: &v2,
            build_id: Some("2"),
        };
        let old = BuildRef {
            manifest: &v1,
            build_id: Some("1"),
        };
        assert!(!is_patchable(&new, &old));
    }

    #[test]
    fn missing_build_id_is_not_patchable() {
        let v2a = Manifest::V2(ManifestV2::default());
        let v2b = Manifest::V2(ManifestV2::default());
        let new = BuildRef {
            manifest: &v2a,
            build_id: None,
        };
        let old = BuildRef {
            manifest: &v2b,
            build_id: Some("1"),
        };
        assert!(!is_patchable(&new, &old));
    }

    #[test]
    fn rejects_non_xdelta3_algorithm() {
        assert!(check_algorithm("bsdiff").is_err());
        assert!(check_algorithm("xdelta3").is_ok());
    }

    #[test]
    fn collects_matching_depot_diffs_only() {
        let patch_entry = PatchEntry {
            source_path: "a".into(),
            target_path: "a".into(),
            md5_source: "1".into(),
            md5_target: "2".into(),
            md5: "p".into(),
            chunks: vec![],
        };
        let manifest = Manifest::V2(ManifestV2 {
            items: vec![ItemV2::DepotDiff(patch_entry.clone())],
            sfc: None,
        });
        let languages = vec!["en-US".to_string()];
        let depots = vec![PatchDepotManifest {
            product_id: "1",
            languages: &languages,
            manifest,
        }];

        let patch = collect_patch_files(&depots, "1", &[], "en-US");
        assert_eq!(patch.files.len(), 1);

        let patch_wrong_lang = collect_patch_files(&depots, "1", &[], "de-DE");
        assert!(patch_wrong_lang.files.is_empty());
    }
}
