//! Multi-part filename helpers (spec.md §6).
//!
//! Two naming conventions are accepted when locating part 0 from any given
//! part path: sequential (`<stem>_1.rgog`, `<stem>_2.rgog`, ...) and suffix
//! (`<stem>.rgog`, `<stem>.part1.rgog`, `<stem>.part2.rgog`, ...).

use std::path::{Path, PathBuf};

/// Given any part's path, returns the path of part 0 (part number 1 in the
/// sequential convention, or the bare `<stem>.rgog` in the suffix convention).
pub fn part_zero_path(path: &Path) -> PathBuf {
    let file_name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return path.to_path_buf(),
    };
    let parent = path.parent().unwrap_or_else(|| Path::new(""));

    if let Some(stripped) = file_name.strip_suffix(".rgog") {
        if let Some(dot) = stripped.rfind(".part") {
            let (stem, rest) = stripped.split_at(dot);
            if rest[".part".len()..].chars().all(|c| c.is_ascii_digit()) && !rest[".part".len()..].is_empty() {
                return parent.join(format!("{stem}.rgog"));
            }
        }
        if let Some(underscore) = stripped.rfind('_') {
            let (stem, suffix) = stripped.split_at(underscore);
            let digits = &suffix[1..];
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                return parent.join(format!("{stem}_1.rgog"));
            }
        }
    }

    path.to_path_buf()
}

/// Builds the path of part `index` (0-based) given `stem` using the
/// sequential `<stem>_N.rgog` convention (1-based on disk).
pub fn sequential_part_path(stem: &Path, index: u32) -> PathBuf {
    let parent = stem.parent().unwrap_or_else(|| Path::new(""));
    let file_stem = stem.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    parent.join(format!("{file_stem}_{}.rgog", index + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_convention_redirects_to_part_one() {
        let any_part = Path::new("/mirrors/game_3.rgog");
        assert_eq!(part_zero_path(any_part), PathBuf::from("/mirrors/game_1.rgog"));
    }

    #[test]
    fn suffix_convention_redirects_to_bare_stem() {
        let any_part = Path::new("/mirrors/game.part2.rgog");
        assert_eq!(part_zero_path(any_part), PathBuf::from("/mirrors/game.rgog"));
    }

    #[test]
    fn part_zero_itself_is_unchanged() {
        let part_zero = Path::new("/mirrors/game_1.rgog");
        assert_eq!(part_zero_path(part_zero), PathBuf::from("/mirrors/game_1.rgog"));
    }

    #[test]
    fn sequential_part_path_builds_one_based_names() {
        let stem = Path::new("/mirrors/game.rgog");
        assert_eq!(sequential_part_path(stem, 0), PathBuf::from("/mirrors/game_1.rgog"));
        assert_eq!(sequential_part_path(stem, 2), PathBuf::from("/mirrors/game_3.rgog"));
    }
}
