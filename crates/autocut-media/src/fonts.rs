//! Font file lookup for title rendering.

use std::path::{Path, PathBuf};

use tracing::debug;

/// System font directories searched after the configured font directory.
pub const SYSTEM_FONT_DIRS: &[&str] = &[
    "/usr/share/fonts/truetype/msttcorefonts",
    "/usr/share/fonts/truetype/dejavu",
];

/// Resolve `file_name` to a font path.
///
/// Searches `font_dir` recursively, then [`SYSTEM_FONT_DIRS`]. When nothing
/// matches, the bare name is returned and FFmpeg's own lookup gets a chance.
pub fn resolve_font(font_dir: Option<&Path>, file_name: &str) -> PathBuf {
    if let Some(found) = font_dir.and_then(|dir| find_recursive(dir, file_name)) {
        return found;
    }

    for dir in SYSTEM_FONT_DIRS {
        let candidate = Path::new(dir).join(file_name);
        if candidate.is_file() {
            return candidate;
        }
    }

    debug!(font = file_name, "Font not found locally, using bare name");
    PathBuf::from(file_name)
}

fn find_recursive(dir: &Path, file_name: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if entry.file_name() == file_name {
            return Some(path);
        }
    }

    subdirs.sort();
    subdirs
        .iter()
        .find_map(|sub| find_recursive(sub, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_finds_nested_font() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("brand").join("bold");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("Impact.ttf"), b"").unwrap();

        assert_eq!(
            resolve_font(Some(dir.path()), "Impact.ttf"),
            nested.join("Impact.ttf")
        );
    }

    #[test]
    fn test_unknown_font_returns_bare_name() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            resolve_font(Some(dir.path()), "NoSuchFont-42.ttf"),
            PathBuf::from("NoSuchFont-42.ttf")
        );
        assert_eq!(
            resolve_font(None, "NoSuchFont-42.ttf"),
            PathBuf::from("NoSuchFont-42.ttf")
        );
    }
}
