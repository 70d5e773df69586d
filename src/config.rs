//! Vault configuration.
//!
//! Loaded once at startup from a TOML file (optionally extended from the
//! command line) and passed by value into [`crate::vault::Vault`]. Nothing
//! reads configuration from global state.
//!
//! ```toml
//! settle_delay_ms = 1000
//! log_level = "info"
//! ignore = ["$RECYCLE.BIN", "System Volume Information", ".git", ".idea", "__pycache__"]
//!
//! [[pairs]]
//! source = "/mnt/b"
//! destination = "/mnt/s/Backup B"
//! ```

use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, PairError};
use crate::sync::ignore::{IgnoreSet, DEFAULT_IGNORES};

/// One source root mirrored into one destination root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackupPair {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl BackupPair {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// Parse a `SOURCE=DESTINATION` command line argument.
    pub fn parse_arg(arg: &str) -> Result<Self, ConfigError> {
        let (source, destination) = arg
            .split_once('=')
            .filter(|(s, d)| !s.is_empty() && !d.is_empty())
            .ok_or_else(|| ConfigError::PairArgument {
                arg: arg.to_string(),
            })?;

        let absolute = |p: &str| std::path::absolute(p).unwrap_or_else(|_| PathBuf::from(p));
        Ok(Self::new(absolute(source), absolute(destination)))
    }

    /// Check the pair invariants and return it with a canonical source root.
    ///
    /// The source must exist and be a directory. Both roots must be absolute,
    /// and the destination may be neither the source nor anywhere beneath it.
    pub fn validate(&self) -> Result<BackupPair, PairError> {
        for path in [&self.source, &self.destination] {
            if !path.is_absolute() {
                return Err(PairError::NotAbsolute { path: path.clone() });
            }
        }

        let source = self
            .source
            .canonicalize()
            .map_err(|_| PairError::SourceMissing {
                path: self.source.clone(),
            })?;
        if !source.is_dir() {
            return Err(PairError::SourceNotDirectory { path: source });
        }

        let destination = resolve_destination(&self.destination);

        if destination.starts_with(&source) || self.destination.starts_with(&self.source) {
            return Err(PairError::DestinationInsideSource {
                source_root: source,
                destination,
            });
        }

        Ok(BackupPair {
            source,
            destination,
        })
    }
}

/// Resolve a destination that may not exist yet.
///
/// The nearest existing ancestor is canonicalized (following symlinks) and
/// the missing tail is appended with `.` and `..` folded lexically. Nothing
/// in the tail exists, so it cannot contain a symlink.
fn resolve_destination(path: &Path) -> PathBuf {
    let mut tail = Vec::new();
    let mut current = path;
    let mut resolved = loop {
        if let Ok(canonical) = current.canonicalize() {
            break canonical;
        }
        match (current.parent(), current.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                current = parent;
            }
            // Path ends in `..`
            (Some(parent), None) => {
                tail.push("..".into());
                current = parent;
            }
            (None, _) => break current.to_path_buf(),
        }
    };

    for name in tail.iter().rev() {
        match Path::new(name).components().next() {
            Some(Component::ParentDir) => {
                resolved.pop();
            }
            Some(Component::CurDir) => {}
            _ => resolved.push(name),
        }
    }
    resolved
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct VaultConfig {
    #[serde(default)]
    pub pairs: Vec<BackupPair>,

    /// Directory names excluded from mirroring and archival.
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,

    /// Pause between a create/modify notification and the copy.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_ignore() -> Vec<String> {
    DEFAULT_IGNORES.iter().map(|s| s.to_string()).collect()
}

fn default_settle_delay_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            pairs: Vec::new(),
            ignore: default_ignore(),
            settle_delay_ms: default_settle_delay_ms(),
            log_level: default_log_level(),
        }
    }
}

impl VaultConfig {
    /// Default config file location: `<config dir>/echovault/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("echovault").join("config.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the explicit file if given, else the default file if it exists,
    /// else built-in defaults with no pairs.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::load_from(&path),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn ignore_set(&self) -> IgnoreSet {
        IgnoreSet::new(self.ignore.iter().map(String::as_str))
    }

    /// Fail if there is nothing to back up.
    pub fn ensure_pairs(&self) -> Result<(), ConfigError> {
        if self.pairs.is_empty() {
            return Err(ConfigError::NoPairs);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_full_config() {
        let content = r#"
settle_delay_ms = 250
log_level = "debug"
ignore = [".git", "node_modules"]

[[pairs]]
source = "/data/photos"
destination = "/backup/photos"
"#;
        let config = VaultConfig::parse(content, Path::new("test.toml")).unwrap();

        assert_eq!(config.settle_delay(), Duration::from_millis(250));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.pairs, vec![BackupPair::new("/data/photos", "/backup/photos")]);
        assert!(config.ignore_set().contains("node_modules"));
        assert!(!config.ignore_set().contains("__pycache__"));
    }

    #[test]
    fn test_defaults_apply() {
        let config = VaultConfig::parse("", Path::new("empty.toml")).unwrap();

        assert_eq!(config.settle_delay_ms, 1000);
        assert!(config.ignore_set().contains("$RECYCLE.BIN"));
        assert!(matches!(config.ensure_pairs(), Err(ConfigError::NoPairs)));
    }

    #[test]
    fn test_parse_error_reports_path() {
        let err = VaultConfig::parse("pairs = 3", Path::new("bad.toml")).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_pair_arg() {
        let pair = BackupPair::parse_arg("/src=/dst").unwrap();
        assert_eq!(pair, BackupPair::new("/src", "/dst"));

        assert!(BackupPair::parse_arg("/src").is_err());
        assert!(BackupPair::parse_arg("=/dst").is_err());
    }

    #[test]
    fn test_validate_rejects_nested_destination() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        std::fs::create_dir(&source).unwrap();

        let pair = BackupPair::new(&source, source.join("backup"));
        assert!(matches!(
            pair.validate(),
            Err(PairError::DestinationInsideSource { .. })
        ));

        let same = BackupPair::new(&source, &source);
        assert!(matches!(
            same.validate(),
            Err(PairError::DestinationInsideSource { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_rejects_destination_through_symlink() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        std::fs::create_dir(&source).unwrap();
        std::os::unix::fs::symlink(&source, dir.path().join("link")).unwrap();

        let pair = BackupPair::new(&source, dir.path().join("link/backup/deeper"));
        assert!(matches!(
            pair.validate(),
            Err(PairError::DestinationInsideSource { .. })
        ));
        assert!(!source.join("backup").exists());
    }

    #[test]
    fn test_validate_rejects_parent_dir_through_missing_dir() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        std::fs::create_dir(&source).unwrap();

        let pair = BackupPair::new(&source, dir.path().join("missing/../src/backup"));
        assert!(matches!(
            pair.validate(),
            Err(PairError::DestinationInsideSource { .. })
        ));
    }

    #[test]
    fn test_resolve_destination_keeps_missing_tail() {
        let dir = tempdir().unwrap();
        let base = dir.path().canonicalize().unwrap();

        assert_eq!(
            resolve_destination(&dir.path().join("a/./b/../c")),
            base.join("a/c")
        );
    }

    #[test]
    fn test_validate_missing_source() {
        let dir = tempdir().unwrap();
        let pair = BackupPair::new(dir.path().join("nope"), dir.path().join("dst"));
        assert!(matches!(pair.validate(), Err(PairError::SourceMissing { .. })));
    }

    #[test]
    fn test_validate_relative_paths() {
        let pair = BackupPair::new("relative/src", "/dst");
        assert!(matches!(pair.validate(), Err(PairError::NotAbsolute { .. })));
    }

    #[test]
    fn test_validate_ok_sibling() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        std::fs::create_dir(&source).unwrap();

        let pair = BackupPair::new(&source, dir.path().join("dst"));
        let valid = pair.validate().unwrap();
        assert_eq!(valid.source, source.canonicalize().unwrap());
    }
}
