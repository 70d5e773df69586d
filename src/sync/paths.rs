//! Source-to-backup path mapping.
//!
//! Every backup-side path (sync target, archive source, rename slots) is
//! derived through [`to_destination`], so a given source file always maps
//! to the same backup location.

use std::path::{Path, PathBuf};

/// Name of the history area directly under each destination root.
pub const HISTORY_DIR: &str = "_deleted_history";

/// Re-root `source_path` from `source_root` under `destination_root`.
///
/// Returns `None` if `source_path` is not inside `source_root`.
pub fn to_destination(
    source_root: &Path,
    destination_root: &Path,
    source_path: &Path,
) -> Option<PathBuf> {
    let relative = source_path.strip_prefix(source_root).ok()?;
    Some(destination_root.join(relative))
}

/// The roots of one backup pair, bundled for repeated mapping.
#[derive(Debug, Clone)]
pub struct PathMapper {
    source_root: PathBuf,
    destination_root: PathBuf,
}

impl PathMapper {
    pub fn new(source_root: impl Into<PathBuf>, destination_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            destination_root: destination_root.into(),
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    pub fn to_destination(&self, source_path: &Path) -> Option<PathBuf> {
        to_destination(&self.source_root, &self.destination_root, source_path)
    }

    /// Path of `source_path` relative to the source root.
    pub fn relative<'a>(&self, source_path: &'a Path) -> Option<&'a Path> {
        source_path.strip_prefix(&self.source_root).ok()
    }

    /// `<destination_root>/_deleted_history`
    pub fn history_root(&self) -> PathBuf {
        self.destination_root.join(HISTORY_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_nested_path() {
        let mapped = to_destination(
            Path::new("/src"),
            Path::new("/backup/src"),
            Path::new("/src/a/b/c.txt"),
        );
        assert_eq!(mapped, Some(PathBuf::from("/backup/src/a/b/c.txt")));
    }

    #[test]
    fn test_maps_root_itself() {
        let mapper = PathMapper::new("/src", "/dst");
        assert_eq!(mapper.to_destination(Path::new("/src")), Some(PathBuf::from("/dst")));
    }

    #[test]
    fn test_rejects_outside_paths() {
        let mapper = PathMapper::new("/src", "/dst");
        assert_eq!(mapper.to_destination(Path::new("/other/file.txt")), None);
        // Component-wise prefix, not string prefix
        assert_eq!(mapper.to_destination(Path::new("/srcfoo/file.txt")), None);
    }

    #[test]
    fn test_relative_and_history() {
        let mapper = PathMapper::new("/src", "/dst");
        assert_eq!(
            mapper.relative(Path::new("/src/dir/f.txt")),
            Some(Path::new("dir/f.txt"))
        );
        assert_eq!(mapper.history_root(), PathBuf::from("/dst/_deleted_history"));
    }
}
