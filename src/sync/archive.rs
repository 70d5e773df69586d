//! History archiving.
//!
//! Backup files are never deleted. When their source goes away (or is
//! renamed) they are moved to `<destination_root>/_deleted_history/<ts>/`,
//! where `<ts>` is the local time at second resolution. All archive
//! operations in the same second share one snapshot directory; a
//! same-named file already in that snapshot is replaced.

use chrono::{DateTime, Local};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::fsops;

/// Snapshot directory name format.
pub const SNAPSHOT_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Source of snapshot timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Wall clock in local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// What an archive call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    Archived { to: PathBuf },
    /// Nothing at the destination path.
    Missing,
    /// Destination path is a directory; only files are archived.
    Skipped,
    /// The move (or the stat before it) failed; the file stays in place.
    Failed,
}

/// Moves backup files into timestamped history snapshots for one pair.
pub struct HistoryArchiver {
    history_root: PathBuf,
    clock: Box<dyn Clock>,
}

impl HistoryArchiver {
    pub fn new(history_root: impl Into<PathBuf>) -> Self {
        Self::with_clock(history_root, LocalClock)
    }

    pub fn with_clock(history_root: impl Into<PathBuf>, clock: impl Clock + 'static) -> Self {
        Self {
            history_root: history_root.into(),
            clock: Box::new(clock),
        }
    }

    pub fn history_root(&self) -> &Path {
        &self.history_root
    }

    /// Snapshot directory for the current second.
    pub fn snapshot_dir(&self) -> PathBuf {
        self.history_root
            .join(self.clock.now().format(SNAPSHOT_FORMAT).to_string())
    }

    /// Move `destination_path` into the current snapshot.
    pub fn archive(&self, destination_path: &Path) -> ArchiveOutcome {
        let metadata = match std::fs::symlink_metadata(destination_path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return ArchiveOutcome::Missing,
            Err(e) => {
                warn!("Cannot archive {}: {}", destination_path.display(), e);
                return ArchiveOutcome::Failed;
            }
        };
        if metadata.is_dir() {
            debug!("Not archiving directory: {}", destination_path.display());
            return ArchiveOutcome::Skipped;
        }

        let Some(file_name) = destination_path.file_name() else {
            return ArchiveOutcome::Skipped;
        };
        let target = self.snapshot_dir().join(file_name);

        if target.exists() {
            warn!(
                "Snapshot collision, replacing {} with {}",
                target.display(),
                destination_path.display()
            );
            if let Err(e) = std::fs::remove_file(&target) {
                error!("Failed to archive {}: {}", destination_path.display(), e);
                return ArchiveOutcome::Failed;
            }
        }

        match fsops::move_file(destination_path, &target) {
            Ok(()) => {
                info!("ARCHIVED: {} -> {}", destination_path.display(), target.display());
                ArchiveOutcome::Archived { to: target }
            }
            Err(e) => {
                error!("Failed to archive {}: {:#}", destination_path.display(), e);
                ArchiveOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::tempdir;

    struct FixedClock(DateTime<Local>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Local> {
            self.0
        }
    }

    fn fixed() -> FixedClock {
        FixedClock(Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap())
    }

    #[test]
    fn test_archive_moves_into_snapshot() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("sub/f.txt");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "Important Data").unwrap();

        let archiver = HistoryArchiver::with_clock(dir.path().join("_deleted_history"), fixed());
        let outcome = archiver.archive(&file);

        let expected = dir.path().join("_deleted_history/2024-03-09_14-05-07/f.txt");
        assert_eq!(outcome, ArchiveOutcome::Archived { to: expected.clone() });
        assert!(!file.exists());
        assert_eq!(fs::read_to_string(expected).unwrap(), "Important Data");
    }

    #[test]
    fn test_archive_missing_is_noop() {
        let dir = tempdir().unwrap();
        let archiver = HistoryArchiver::new(dir.path().join("_deleted_history"));

        assert_eq!(archiver.archive(&dir.path().join("nothing")), ArchiveOutcome::Missing);
        assert!(!archiver.history_root().exists());
    }

    #[test]
    fn test_archive_stat_error_is_failure() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        // ENOTDIR, not NotFound
        let archiver = HistoryArchiver::new(dir.path().join("_deleted_history"));
        assert_eq!(archiver.archive(&file.join("child")), ArchiveOutcome::Failed);
        assert!(file.exists());
    }

    #[test]
    fn test_archive_skips_directories() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("folder");
        fs::create_dir(&sub).unwrap();

        let archiver = HistoryArchiver::new(dir.path().join("_deleted_history"));
        assert_eq!(archiver.archive(&sub), ArchiveOutcome::Skipped);
        assert!(sub.is_dir());
    }

    #[test]
    fn test_same_second_collision_replaces() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a/f.txt");
        let b = dir.path().join("b/f.txt");
        fs::create_dir_all(a.parent().unwrap()).unwrap();
        fs::create_dir_all(b.parent().unwrap()).unwrap();
        fs::write(&a, "first").unwrap();
        fs::write(&b, "second").unwrap();

        let archiver = HistoryArchiver::with_clock(dir.path().join("_deleted_history"), fixed());
        archiver.archive(&a);
        let outcome = archiver.archive(&b);

        let ArchiveOutcome::Archived { to } = outcome else {
            panic!("expected archive, got {outcome:?}");
        };
        assert_eq!(fs::read_to_string(to).unwrap(), "second");
        assert!(!a.exists());
        assert!(!b.exists());
    }
}
