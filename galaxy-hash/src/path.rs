//! Content-addressed path layout: `aa/bb/aabbcc...`.

use std::borrow::Cow;

/// Returns the content-addressed path fragment for a hash.
///
/// When `hash` is exactly 32 hex characters, this returns `"{h[0:2]}/{h[2:4]}/{h}"`.
/// Otherwise `hash` is assumed to already be a path and is returned unchanged — the
/// content-system occasionally hands back values that are paths rather than bare
/// hashes (e.g. dependency redistributable coordinates).
pub fn galaxy_path(hash: &str) -> Cow<'_, str> {
    if hash.len() == 32 && hash.bytes().all(|b| b.is_ascii_hexdigit()) {
        Cow::Owned(format!("{}/{}/{}", &hash[0..2], &hash[2..4], hash))
    } else {
        Cow::Borrowed(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_32_hex_hash() {
        let hash = "0030af763e1a09ab307d84a24d0066a2";
        assert_eq!(galaxy_path(hash), "00/30/0030af763e1a09ab307d84a24d0066a2");
    }

    #[test]
    fn uppercase_hex_still_treated_as_hash() {
        let hash = "0030AF763E1A09AB307D84A24D0066A2";
        assert_eq!(galaxy_path(hash), "00/30/0030AF763E1A09AB307D84A24D0066A2");
    }

    #[test]
    fn non_hash_input_passes_through() {
        assert_eq!(galaxy_path("/dependencies/store/foo"), "/dependencies/store/foo");
        assert_eq!(galaxy_path("too-short"), "too-short");
    }

    #[test]
    fn wrong_length_passes_through() {
        let almost = "0030af763e1a09ab307d84a24d0066"; // 30 chars
        assert_eq!(galaxy_path(almost), almost);
    }
}
