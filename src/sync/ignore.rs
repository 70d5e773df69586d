//! Directory-name exclusion for mirroring.
//!
//! Entries are matched literally against each path component. A single
//! matching component excludes the path and everything below it.

use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::path::{Component, Path};

/// Names excluded when the configuration does not provide its own list.
pub const DEFAULT_IGNORES: &[&str] = &[
    // Windows volume metadata
    "$RECYCLE.BIN",
    "System Volume Information",
    // Version control / IDE
    ".git",
    ".idea",
    // Build artifacts
    "__pycache__",
];

/// Fixed set of excluded directory names.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    names: HashSet<OsString>,
}

impl IgnoreSet {
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            names: names.into_iter().map(OsString::from).collect(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_IGNORES.iter().copied())
    }

    /// Whether `name` is one of the excluded names.
    pub fn contains(&self, name: impl AsRef<OsStr>) -> bool {
        self.names.contains(name.as_ref())
    }

    /// Check every normal component of `path`.
    ///
    /// Callers pass paths relative to the source root so that the root's
    /// own ancestors never cause a match.
    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.names.is_empty() {
            return false;
        }
        path.components().any(|component| match component {
            Component::Normal(name) => self.names.contains(name),
            _ => false,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ignores() {
        let ignore = IgnoreSet::with_defaults();

        assert!(ignore.is_ignored(Path::new(".git")));
        assert!(ignore.is_ignored(Path::new(".git/config")));
        assert!(ignore.is_ignored(Path::new("project/__pycache__/mod.pyc")));
        assert!(ignore.is_ignored(Path::new("$RECYCLE.BIN/S-1-5/file.txt")));
        assert!(ignore.is_ignored(Path::new("System Volume Information/x")));

        assert!(!ignore.is_ignored(Path::new("src/main.rs")));
        assert!(!ignore.is_ignored(Path::new("notes.git/readme")));
    }

    #[test]
    fn test_literal_match_only() {
        let ignore = IgnoreSet::new(["cache"]);

        assert!(ignore.is_ignored(Path::new("a/cache/b.txt")));
        assert!(!ignore.is_ignored(Path::new("a/caches/b.txt")));
        assert!(!ignore.is_ignored(Path::new("a/Cache/b.txt")));
    }

    #[test]
    fn test_empty_set_ignores_nothing() {
        let ignore = IgnoreSet::default();
        assert!(ignore.is_empty());
        assert!(!ignore.is_ignored(Path::new(".git/HEAD")));
    }
}
