//! Core manifest entities (spec.md §3).

use serde::Deserialize;

/// A V2 content-addressed chunk.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Chunk {
    pub compressed_md5: String,
    pub compressed_size: u64,
    pub uncompressed_md5: String,
    pub uncompressed_size: u64,
}

/// Coordinates of a file bundled inside a small-files container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SfcRef {
    pub offset: u64,
    pub size: u64,
}

/// A V1 file entry: `{path, offset, size, md5}` into `main.bin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntryV1 {
    pub path: String,
    pub offset: u64,
    pub size: u64,
    pub md5: String,
}

/// A V1 manifest: an ordered list of file entries for one (generation, depot)
/// pair. Size-0 entries are directories and are never materialized as
/// [`FileEntryV1`] values (spec §9 ambiguity (b): treated as "skip", matching the
/// original sample code's observed behavior).
#[derive(Debug, Clone, Default)]
pub struct ManifestV1 {
    pub files: Vec<FileEntryV1>,
}

/// A V2 depot file. `sfc_ref`, when present, is preferred over `chunks` for
/// extraction; `chunks` is then kept only as an optional fallback
/// (`has_sfc_fallback = true`), per spec §9 ambiguity (c).
#[derive(Debug, Clone, PartialEq)]
pub struct DepotFile {
    pub path: String,
    pub size: u64,
    pub md5: Option<String>,
    pub sha256: Option<String>,
    pub chunks: Vec<Chunk>,
    pub sfc_ref: Option<SfcRef>,
    pub has_sfc_fallback: bool,
}

/// A `DepotDiff` patch entry: downloading all chunks in order yields the xdelta3
/// delta transforming `source_path` into `target_path`.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchEntry {
    pub source_path: String,
    pub target_path: String,
    pub md5_source: String,
    pub md5_target: String,
    pub md5: String,
    pub chunks: Vec<Chunk>,
}

/// One item in a V2 manifest.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemV2 {
    DepotFile(DepotFile),
    DepotDiff(PatchEntry),
}

/// A V2 manifest: an ordered list of items, plus the synthetic small-files
/// container item (if the manifest declared a top-level `smallFilesContainer`).
#[derive(Debug, Clone, Default)]
pub struct ManifestV2 {
    pub items: Vec<ItemV2>,
    pub sfc: Option<DepotFile>,
}

impl ManifestV2 {
    /// All `DepotFile` items, including the synthetic SFC item if present.
    pub fn depot_files(&self) -> impl Iterator<Item = &DepotFile> {
        self.items
            .iter()
            .filter_map(|item| match item {
                ItemV2::DepotFile(f) => Some(f),
                ItemV2::DepotDiff(_) => None,
            })
            .chain(self.sfc.iter())
    }

    /// All `DepotDiff` (patch) items.
    pub fn patch_entries(&self) -> impl Iterator<Item = &PatchEntry> {
        self.items.iter().filter_map(|item| match item {
            ItemV2::DepotDiff(p) => Some(p),
            ItemV2::DepotFile(_) => None,
        })
    }
}

/// A manifest of either generation, as used by diffing and depot filtering.
#[derive(Debug, Clone)]
pub enum Manifest {
    V1(ManifestV1),
    V2(ManifestV2),
}

/// A depot's filterable attributes, shared by V1 `DepotDescriptorV1` and V2
/// `DepotManifestRefV2` — kept generic here so `galaxy-manifest` does not need to
/// depend on `galaxy-client`'s wire types.
#[derive(Debug, Clone, Default)]
pub struct DepotAttributes<'a> {
    pub languages: &'a [String],
    pub bitness: Option<&'a str>,
    pub product_id: Option<&'a str>,
}

/// A filter request against [`DepotAttributes`]. `None` in any field means "don't
/// filter on this criterion"; `Some("*")` in the depot's own field always matches.
#[derive(Debug, Clone, Default)]
pub struct DepotFilter<'a> {
    pub language: Option<&'a str>,
    pub bitness: Option<&'a str>,
    pub product_ids: Option<&'a [&'a str]>,
}

/// Returns true iff `depot` matches `filter`, per spec §4.4's wildcard/exact-match
/// predicate.
pub fn depot_matches(depot: &DepotAttributes<'_>, filter: &DepotFilter<'_>) -> bool {
    if let Some(language) = filter.language {
        let matches = depot.languages.iter().any(|l| l == "*" || l == language);
        if !matches {
            return false;
        }
    }
    if let Some(wanted) = filter.bitness {
        match depot.bitness {
            Some("*") | None => {}
            Some(actual) if actual == wanted => {}
            _ => return false,
        }
    }
    if let Some(ids) = filter.product_ids {
        match depot.product_id {
            Some(pid) if ids.contains(&pid) => {}
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depot(languages: &[String], product_id: Option<&str>) -> DepotAttributes<'_> {
        DepotAttributes {
            languages,
            bitness: None,
            product_id,
        }
    }

    #[test]
    fn wildcard_language_always_matches() {
        let languages = vec!["*".to_string()];
        let d = depot(&languages, None);
        let filter = DepotFilter {
            language: Some("en-US"),
            ..Default::default()
        };
        assert!(depot_matches(&d, &filter));
    }

    #[test]
    fn exact_language_mismatch_excludes() {
        let languages = vec!["de-DE".to_string()];
        let d = depot(&languages, None);
        let filter = DepotFilter {
            language: Some("en-US"),
            ..Default::default()
        };
        assert!(!depot_matches(&d, &filter));
    }

    #[test]
    fn product_id_membership_is_exact() {
        let languages = vec!["en-US".to_string()];
        let d = depot(&languages, Some("42"));
        let filter = DepotFilter {
            product_ids: Some(&["1", "2"]),
            ..Default::default()
        };
        assert!(!depot_matches(&d, &filter));

        let filter_matching = DepotFilter {
            product_ids: Some(&["1", "42"]),
            ..Default::default()
        };
        assert!(depot_matches(&d, &filter_matching));
    }

    #[test]
    fn no_criteria_matches_everything() {
        let languages = vec!["fr-FR".to_string()];
        let d = depot(&languages, None);
        assert!(depot_matches(&d, &DepotFilter::default()));
    }
}
