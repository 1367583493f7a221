//! Path helpers for the on-disk `MirrorTree` layout (spec.md §3):
//!
//! ```text
//! <game>/v1/manifests/<pid>/<plat>/<ts>/{repository.json, <manifest_uuid>}
//! <game>/v1/depots/<pid>/<plat>/<ts>/main.bin
//! <game>/v2/meta/aa/bb/<hash>
//! <game>/v2/store/<product_id>/aa/bb/<hash>
//! <game>/v2/debug/<hash>_{depot,manifest}.json
//! ```

use galaxy_hash::galaxy_path;
use std::path::{Path, PathBuf};

/// Root of one game's mirror tree.
#[derive(Debug, Clone)]
pub struct MirrorTree {
    root: PathBuf,
}

impl MirrorTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn v1_manifests_dir(&self, product_id: &str, platform: &str, timestamp: &str) -> PathBuf {
        self.root.join("v1/manifests").join(product_id).join(platform).join(timestamp)
    }

    pub fn v1_repository_path(&self, product_id: &str, platform: &str, timestamp: &str) -> PathBuf {
        self.v1_manifests_dir(product_id, platform, timestamp).join("repository.json")
    }

    pub fn v1_manifest_path(&self, product_id: &str, platform: &str, timestamp: &str, manifest_uuid: &str) -> PathBuf {
        self.v1_manifests_dir(product_id, platform, timestamp).join(manifest_uuid)
    }

    pub fn v1_depot_dir(&self, product_id: &str, platform: &str, timestamp: &str) -> PathBuf {
        self.root.join("v1/depots").join(product_id).join(platform).join(timestamp)
    }

    pub fn v1_main_bin_path(&self, product_id: &str, platform: &str, timestamp: &str) -> PathBuf {
        self.v1_depot_dir(product_id, platform, timestamp).join("main.bin")
    }

    pub fn v2_meta_path(&self, hash: &str) -> PathBuf {
        self.root.join("v2/meta").join(galaxy_path(hash).as_ref())
    }

    pub fn v2_store_path(&self, product_id: &str, compressed_md5: &str) -> PathBuf {
        self.root
            .join("v2/store")
            .join(product_id)
            .join(galaxy_path(compressed_md5).as_ref())
    }

    pub fn v2_debug_depot_path(&self, hash: &str) -> PathBuf {
        self.root.join("v2/debug").join(format!("{hash}_depot.json"))
    }

    pub fn v2_debug_manifest_path(&self, hash: &str) -> PathBuf {
        self.root.join("v2/debug").join(format!("{hash}_manifest.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v2_meta_path_is_content_addressed() {
        let tree = MirrorTree::new("/mirror/game");
        let path = tree.v2_meta_path("0030af763e1a09ab307d84a24d0066a2");
        assert_eq!(
            path,
            PathBuf::from("/mirror/game/v2/meta/00/30/0030af763e1a09ab307d84a24d0066a2")
        );
    }

    #[test]
    fn v2_store_path_is_scoped_to_product() {
        let tree = MirrorTree::new("/mirror/game");
        let path = tree.v2_store_path("1207658930", "0030af763e1a09ab307d84a24d0066a2");
        assert_eq!(
            path,
            PathBuf::from("/mirror/game/v2/store/1207658930/00/30/0030af763e1a09ab307d84a24d0066a2")
        );
    }

    #[test]
    fn v1_layout_nests_by_product_platform_timestamp() {
        let tree = MirrorTree::new("/mirror/game");
        assert_eq!(
            tree.v1_repository_path("1", "windows", "123"),
            PathBuf::from("/mirror/game/v1/manifests/1/windows/123/repository.json")
        );
        assert_eq!(
            tree.v1_main_bin_path("1", "windows", "123"),
            PathBuf::from("/mirror/game/v1/depots/1/windows/123/main.bin")
        );
    }
}
