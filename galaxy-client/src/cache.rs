//! Process-wide secure-link cache.
//!
//! This is one of the three shared mutables called out in spec §5 (alongside the
//! token cache inside `galaxy-http::Session` and the progress counter in
//! `galaxy-download`). It is a single map behind an exclusive lock; contention is
//! bounded because each key is written at most once per run.

use crate::types::SecureLink;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Cache key: `(product_id, path, generation)`.
type Key = (String, String, u8);

/// A process-wide cache of secure links, keyed by `(product_id, path, generation)`.
#[derive(Default)]
pub struct SecureLinkCache {
    entries: Mutex<HashMap<Key, SecureLink>>,
}

impl SecureLinkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a cached link if present.
    pub fn get(&self, product_id: &str, path: &str, generation: u8) -> Option<SecureLink> {
        let key = (product_id.to_string(), path.to_string(), generation);
        self.entries.lock().get(&key).cloned()
    }

    /// Inserts a link, overwriting any previous value for the same key.
    pub fn insert(&self, product_id: &str, path: &str, generation: u8, link: SecureLink) {
        let key = (product_id.to_string(), path.to_string(), generation);
        self.entries.lock().insert(key, link);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_by_full_key() {
        let cache = SecureLinkCache::new();
        assert!(cache.get("1", "/windows/123/", 1).is_none());

        cache.insert(
            "1",
            "/windows/123/",
            1,
            SecureLink {
                templates: vec!["https://cdn/{GALAXY_PATH}".to_string()],
            },
        );

        assert!(cache.get("1", "/windows/123/", 1).is_some());
        assert!(cache.get("1", "/windows/123/", 2).is_none(), "generation is part of the key");
        assert!(cache.get("2", "/windows/123/", 1).is_none(), "product_id is part of the key");
    }
}
