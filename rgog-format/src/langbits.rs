//! The closed language-code table shared by packer and unpacker (spec.md §4.8,
//! §9): each depot's language list is encoded into a fixed 128-bit bitset.
//! Unknown codes are silently ignored (set no bit); this table is the only
//! place that assignment is made, so packer and decoder never drift apart.

/// `(language code, bit index)` pairs, in table order. Bit index is also the
/// array index, kept explicit for readability and to make future insertions
/// (which must never reuse an index) an obvious diff.
pub const LANGUAGE_TABLE: &[(&str, u8)] = &[
    ("en-US", 0),
    ("en-GB", 1),
    ("de-DE", 2),
    ("fr-FR", 3),
    ("es-ES", 4),
    ("es-MX", 5),
    ("it-IT", 6),
    ("pt-PT", 7),
    ("pt-BR", 8),
    ("ru-RU", 9),
    ("pl-PL", 10),
    ("nl-NL", 11),
    ("sv-SE", 12),
    ("no-NO", 13),
    ("da-DK", 14),
    ("fi-FI", 15),
    ("cs-CZ", 16),
    ("hu-HU", 17),
    ("tr-TR", 18),
    ("ja-JP", 19),
    ("ko-KR", 20),
    ("zh-CN", 21),
    ("zh-TW", 22),
    ("ar-AR", 23),
    ("th-TH", 24),
    ("vi-VN", 25),
    ("id-ID", 26),
    ("ms-MY", 27),
    ("el-GR", 28),
    ("he-IL", 29),
    ("ro-RO", 30),
    ("bg-BG", 31),
    ("hr-HR", 32),
    ("sk-SK", 33),
    ("sl-SI", 34),
    ("sr-SP", 35),
    ("uk-UA", 36),
    ("et-EE", 37),
    ("lv-LV", 38),
    ("lt-LT", 39),
    ("is-IS", 40),
    ("ga-IE", 41),
    ("cy-GB", 42),
    ("mt-MT", 43),
    ("ca-ES", 44),
    ("eu-ES", 45),
    ("gl-ES", 46),
    ("af-ZA", 47),
    ("sq-AL", 48),
    ("am-ET", 49),
    ("hy-AM", 50),
    ("az-AZ", 51),
    ("be-BY", 52),
    ("bn-BD", 53),
    ("bs-BA", 54),
    ("my-MM", 55),
    ("km-KH", 56),
    ("ka-GE", 57),
    ("gu-IN", 58),
    ("ha-NG", 59),
    ("hi-IN", 60),
    ("ig-NG", 61),
    ("kn-IN", 62),
    ("kk-KZ", 63),
    ("ky-KG", 64),
    ("lo-LA", 65),
    ("mk-MK", 66),
    ("ml-IN", 67),
    ("mn-MN", 68),
    ("mr-IN", 69),
    ("ne-NP", 70),
    ("or-IN", 71),
    ("pa-IN", 72),
    ("ps-AF", 73),
    ("fa-IR", 74),
    ("sw-KE", 75),
    ("ta-IN", 76),
    ("te-IN", 77),
    ("tg-TJ", 78),
    ("tl-PH", 79),
    ("ur-PK", 80),
    ("uz-UZ", 81),
    ("yo-NG", 82),
    ("so-SO", 83),
];

fn bit_for(code: &str) -> Option<u8> {
    LANGUAGE_TABLE.iter().find(|(c, _)| c.eq_ignore_ascii_case(code)).map(|(_, bit)| *bit)
}

fn code_for(bit: u8) -> Option<&'static str> {
    LANGUAGE_TABLE.iter().find(|(_, b)| *b == bit).map(|(c, _)| *c)
}

/// Encodes a depot's language list into a 128-bit bitset split `(lo, hi)`.
/// Codes not present in [`LANGUAGE_TABLE`] (including the `*` wildcard) set no
/// bit and are silently dropped.
pub fn encode_languages<S: AsRef<str>>(languages: &[S]) -> (u64, u64) {
    let mut lo = 0u64;
    let mut hi = 0u64;
    for language in languages {
        if let Some(bit) = bit_for(language.as_ref()) {
            if bit < 64 {
                lo |= 1u64 << bit;
            } else {
                hi |= 1u64 << (bit - 64);
            }
        }
    }
    (lo, hi)
}

/// Decodes a `(lo, hi)` bitset back into the language codes it represents, in
/// table order.
pub fn decode_languages(lo: u64, hi: u64) -> Vec<&'static str> {
    let mut codes = Vec::new();
    for bit in 0..64u8 {
        if lo & (1u64 << bit) != 0 {
            if let Some(code) = code_for(bit) {
                codes.push(code);
            }
        }
    }
    for bit in 0..64u8 {
        if hi & (1u64 << bit) != 0 {
            if let Some(code) = code_for(bit + 64) {
                codes.push(code);
            }
        }
    }
    codes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn table_has_at_most_128_entries_and_no_duplicate_bits() {
        assert!(LANGUAGE_TABLE.len() <= 128);
        let bits: HashSet<u8> = LANGUAGE_TABLE.iter().map(|(_, bit)| *bit).collect();
        assert_eq!(bits.len(), LANGUAGE_TABLE.len(), "duplicate bit index in language table");
    }

    #[test]
    fn anchors_match_spec_examples() {
        assert_eq!(bit_for("en-US"), Some(0));
        assert_eq!(bit_for("en-GB"), Some(1));
        assert_eq!(bit_for("so-SO"), Some(83));
    }

    #[test]
    fn unknown_code_sets_no_bit() {
        let (lo, hi) = encode_languages(&["*", "xx-XX"]);
        assert_eq!((lo, hi), (0, 0));
    }

    #[test]
    fn encode_decode_round_trips() {
        let (lo, hi) = encode_languages(&["en-US", "de-DE", "so-SO"]);
        let mut decoded = decode_languages(lo, hi);
        decoded.sort_unstable();
        let mut expected = vec!["en-US", "de-DE", "so-SO"];
        expected.sort_unstable();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn bit_83_lands_in_high_word() {
        let (lo, hi) = encode_languages(&["so-SO"]);
        assert_eq!(lo, 0);
        assert_eq!(hi, 1u64 << (83 - 64));
    }
}
