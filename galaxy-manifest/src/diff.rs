//! Manifest comparison (spec §4.4).

use crate::types::{Manifest, PatchEntry};
use std::collections::HashMap;

/// A file's content identity, compared in the order of availability spec §4.4
/// lists: `md5`, `sha256`, single-chunk uncompressed hash, full chunk list.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ContentSignature {
    Md5(String),
    Sha256(String),
    SingleChunkUncompressed(String),
    ChunkList(Vec<String>),
}

impl ContentSignature {
    /// The hash value to compare against a patch entry's `md5_source`, when one
    /// exists. `ChunkList` signatures have no single hash and can never match a
    /// patch.
    fn as_patchable_hash(&self) -> Option<&str> {
        match self {
            ContentSignature::Md5(h) | ContentSignature::SingleChunkUncompressed(h) => Some(h),
            ContentSignature::Sha256(h) => Some(h),
            ContentSignature::ChunkList(_) => None,
        }
    }
}

struct UnifiedFile {
    path: String,
    signature: ContentSignature,
}

fn unify(manifest: &Manifest) -> Vec<UnifiedFile> {
    match manifest {
        Manifest::V1(m) => m
            .files
            .iter()
            .map(|f| UnifiedFile {
                path: f.path.to_lowercase(),
                signature: ContentSignature::Md5(f.md5.clone()),
            })
            .collect(),
        Manifest::V2(m) => m
            .depot_files()
            .map(|f| {
                let signature = if let Some(md5) = &f.md5 {
                    ContentSignature::Md5(md5.clone())
                } else if let Some(sha256) = &f.sha256 {
                    ContentSignature::Sha256(sha256.clone())
                } else if let [only] = f.chunks.as_slice() {
                    ContentSignature::SingleChunkUncompressed(only.uncompressed_md5.clone())
                } else {
                    ContentSignature::ChunkList(f.chunks.iter().map(|c| c.compressed_md5.clone()).collect())
                };
                UnifiedFile {
                    path: f.path.to_lowercase(),
                    signature,
                }
            })
            .collect(),
    }
}

fn is_v1(manifest: &Manifest) -> bool {
    matches!(manifest, Manifest::V1(_))
}

/// A `changed` or `new` file, plus the entry it was diffed against (if any) — used
/// by [`ManifestDiff::patched`] to carry the matching patch entry.
#[derive(Debug, Clone)]
pub struct PatchedFile {
    pub path: String,
    pub patch: PatchEntry,
}

/// The result of comparing two manifests.
#[derive(Debug, Clone, Default)]
pub struct ManifestDiff {
    pub new: Vec<String>,
    pub changed: Vec<String>,
    pub patched: Vec<PatchedFile>,
    pub deleted: Vec<String>,
}

impl ManifestDiff {
    /// Compares `new_manifest` against `old_manifest` (absent on a first
    /// install), incorporating any available `patches` into the `patched` bucket.
    ///
    /// `new ∩ deleted ∩ changed ∩ patched = ∅` always holds: every path appears in
    /// exactly one bucket.
    pub fn compare(new_manifest: &Manifest, old_manifest: Option<&Manifest>, patches: &[PatchEntry]) -> Self {
        let new_files = unify(new_manifest);

        let Some(old_manifest) = old_manifest else {
            return ManifestDiff {
                new: new_files.into_iter().map(|f| f.path).collect(),
                ..Default::default()
            };
        };

        let old_files = unify(old_manifest);
        let old_by_path: HashMap<&str, &UnifiedFile> = old_files.iter().map(|f| (f.path.as_str(), f)).collect();
        let new_by_path: HashMap<&str, &UnifiedFile> = new_files.iter().map(|f| (f.path.as_str(), f)).collect();

        let cross_generation = is_v1(new_manifest) != is_v1(old_manifest);
        let patches_by_source: HashMap<&str, &PatchEntry> =
            patches.iter().map(|p| (p.md5_source.as_str(), p)).collect();

        let mut diff = ManifestDiff::default();

        for new_file in &new_files {
            match old_by_path.get(new_file.path.as_str()) {
                None => diff.new.push(new_file.path.clone()),
                Some(old_file) => {
                    if cross_generation {
                        diff.changed.push(new_file.path.clone());
                        continue;
                    }
                    if new_file.signature == old_file.signature {
                        continue;
                    }
                    let old_hash = old_file.signature.as_patchable_hash();
                    match old_hash.and_then(|h| patches_by_source.get(h)) {
                        Some(patch) => diff.patched.push(PatchedFile {
                            path: new_file.path.clone(),
                            patch: (*patch).clone(),
                        }),
                        None => diff.changed.push(new_file.path.clone()),
                    }
                }
            }
        }

        for old_file in &old_files {
            if !new_by_path.contains_key(old_file.path.as_str()) {
                diff.deleted.push(old_file.path.clone());
            }
        }

        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileEntryV1, ManifestV1};

    fn v1(files: Vec<(&str, &str)>) -> Manifest {
        Manifest::V1(ManifestV1 {
            files: files
                .into_iter()
                .map(|(path, md5)| FileEntryV1 {
                    path: path.to_string(),
                    offset: 0,
                    size: 1,
                    md5: md5.to_string(),
                })
                .collect(),
        })
    }

    #[test]
    fn first_install_marks_everything_new() {
        let new = v1(vec![("a", "1"), ("b", "2")]);
        let diff = ManifestDiff::compare(&new, None, &[]);
        assert_eq!(diff.new.len(), 2);
        assert!(diff.changed.is_empty() && diff.patched.is_empty() && diff.deleted.is_empty());
    }

    #[test]
    fn unchanged_hash_emits_nothing() {
        let old = v1(vec![("a", "1")]);
        let new = v1(vec![("a", "1")]);
        let diff = ManifestDiff::compare(&new, Some(&old), &[]);
        assert!(diff.new.is_empty() && diff.changed.is_empty() && diff.deleted.is_empty());
    }

    #[test]
    fn changed_hash_without_patch_is_changed() {
        let old = v1(vec![("a", "1")]);
        let new = v1(vec![("a", "2")]);
        let diff = ManifestDiff::compare(&new, Some(&old), &[]);
        assert_eq!(diff.changed, vec!["a".to_string()]);
    }

    #[test]
    fn changed_hash_with_matching_patch_is_patched() {
        let old = v1(vec![("a", "1")]);
        let new = v1(vec![("a", "2")]);
        let patch = PatchEntry {
            source_path: "a".into(),
            target_path: "a".into(),
            md5_source: "1".into(),
            md5_target: "2".into(),
            md5: "p".into(),
            chunks: vec![],
        };
        let diff = ManifestDiff::compare(&new, Some(&old), std::slice::from_ref(&patch));
        assert_eq!(diff.patched.len(), 1);
        assert!(diff.changed.is_empty());
    }

    #[test]
    fn removed_path_is_deleted() {
        let old = v1(vec![("a", "1"), ("b", "1")]);
        let new = v1(vec![("a", "1")]);
        let diff = ManifestDiff::compare(&new, Some(&old), &[]);
        assert_eq!(diff.deleted, vec!["b".to_string()]);
    }

    #[test]
    fn path_identity_is_case_insensitive() {
        let old = v1(vec![("A.TXT", "1")]);
        let new = v1(vec![("a.txt", "1")]);
        let diff = ManifestDiff::compare(&new, Some(&old), &[]);
        assert!(diff.new.is_empty() && diff.deleted.is_empty());
    }

    proptest::proptest! {
        #[test]
        fn buckets_never_overlap(
            old_paths in proptest::collection::vec("[a-c]", 0..5),
            new_paths in proptest::collection::vec("[a-c]", 0..5),
        ) {
            let old = v1(old_paths.iter().map(|p| (p.as_str(), "h1")).collect());
            let new = v1(new_paths.iter().map(|p| (p.as_str(), "h2")).collect());
            let diff = ManifestDiff::compare(&new, Some(&old), &[]);

            let mut seen = std::collections::HashSet::new();
            for bucket in [&diff.new, &diff.changed, &diff.deleted] {
                for path in bucket {
                    proptest::prop_assert!(seen.insert(path.clone()), "path {} appeared twice", path);
                }
            }
            for patched in &diff.patched {
                proptest::prop_assert!(seen.insert(patched.path.clone()), "path {} appeared twice", patched.path);
            }
        }
    }
}
