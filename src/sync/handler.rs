//! Reconciliation of change events for one backup pair.
//!
//! Every event goes through [`ReconcileHandler::handle`], a single match
//! over [`ChangeEvent`]. Creates and modifies become syncs (after a settle
//! delay), deletes become archives, and renames become a sync of the new
//! location followed by an archive of the old backup slot. Nothing here
//! returns an error; every failure ends as a log line.
//!
//! A directory that appears in the source (created, or moved in from
//! outside) is walked and each file in it synced: the watcher reports the
//! directory but not the files already inside it.

use std::collections::HashSet;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use super::archive::{ArchiveOutcome, HistoryArchiver};
use super::engine::{SyncEngine, SyncOutcome};
use super::ignore::IgnoreSet;
use super::metadata::{likely_unchanged, FileIdentity};
use super::paths::{PathMapper, HISTORY_DIR};
use super::scanner::walk_files;
use super::event::ChangeEvent;
use crate::config::BackupPair;

/// Default pause between a write notification and the copy.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Bounded wait before syncing a freshly written file.
///
/// A "created" notification can arrive before the writer has flushed. The
/// wait bounds the window in which a half-written file could be copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settle {
    delay: Duration,
}

impl Settle {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn wait(&self) {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
    }
}

impl Default for Settle {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_DELAY)
    }
}

/// What handling one event (or scan entry) amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    /// Directory event, ignored path, or path outside the source root.
    Ignored,
    /// Scan entry passed the fast metadata check.
    Skipped,
    Synced(SyncOutcome),
    Archived(ArchiveOutcome),
    Renamed {
        synced: SyncOutcome,
        archived: ArchiveOutcome,
    },
    /// New directory expanded into per-file syncs.
    SyncedDir { synced: usize, failed: usize },
    /// Directory rename expanded into per-file work.
    RenamedDir {
        synced: usize,
        archived: usize,
        failed: usize,
    },
}

/// Event handler for a single (source, destination) pair.
pub struct ReconcileHandler {
    engine: SyncEngine,
    archiver: HistoryArchiver,
    ignore: IgnoreSet,
    settle: Settle,
}

impl ReconcileHandler {
    pub fn new(pair: &BackupPair, ignore: IgnoreSet, settle: Settle) -> Self {
        let mapper = PathMapper::new(&pair.source, &pair.destination);
        let archiver = HistoryArchiver::new(mapper.history_root());
        Self::with_parts(SyncEngine::new(mapper), archiver, ignore, settle)
    }

    pub fn with_parts(
        engine: SyncEngine,
        archiver: HistoryArchiver,
        ignore: IgnoreSet,
        settle: Settle,
    ) -> Self {
        Self {
            engine,
            archiver,
            ignore,
            settle,
        }
    }

    pub fn mapper(&self) -> &PathMapper {
        self.engine.mapper()
    }

    pub fn ignore(&self) -> &IgnoreSet {
        &self.ignore
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Dispatch one change event.
    pub fn handle(&self, event: &ChangeEvent) -> Reconciled {
        match event {
            ChangeEvent::Created { path, is_dir: true } => {
                if self.is_ignored(path) {
                    return Reconciled::Ignored;
                }
                self.settle.wait();
                let (synced, failed) = self.sync_dir(path);
                Reconciled::SyncedDir { synced, failed }
            }
            ChangeEvent::Created { path, is_dir } | ChangeEvent::Modified { path, is_dir } => {
                if *is_dir || self.is_ignored(path) {
                    return Reconciled::Ignored;
                }
                self.settle.wait();
                Reconciled::Synced(self.engine.sync(path))
            }
            ChangeEvent::Deleted { path, is_dir } => {
                if *is_dir || self.is_ignored(path) {
                    return Reconciled::Ignored;
                }
                warn!("File deleted in source: {}", path.display());
                Reconciled::Archived(self.archive_source(path))
            }
            ChangeEvent::Renamed {
                old_path,
                new_path,
                is_dir,
            } => {
                // Only the old path is filtered: a rename into an ignored
                // directory is still mirrored.
                if self.is_ignored(old_path) {
                    return Reconciled::Ignored;
                }
                if *is_dir {
                    self.rename_dir(old_path, new_path)
                } else {
                    let synced = self.engine.sync(new_path);
                    let archived = self.archive_source(old_path);
                    Reconciled::Renamed { synced, archived }
                }
            }
        }
    }

    /// Initial-scan fast path: skip files whose backup matches by size and
    /// mtime, sync everything else.
    pub fn scan_entry(&self, path: &Path, metadata: &Metadata) -> Reconciled {
        if self.is_ignored(path) {
            return Reconciled::Ignored;
        }
        let Some(destination) = self.mapper().to_destination(path) else {
            return Reconciled::Ignored;
        };

        if let Ok(dest_identity) = FileIdentity::stat(&destination) {
            let source_identity = FileIdentity::from_metadata(path, metadata);
            if likely_unchanged(&source_identity, &dest_identity) {
                debug!("Skipping unchanged: {}", path.display());
                return Reconciled::Skipped;
            }
        }
        Reconciled::Synced(self.engine.sync(path))
    }

    /// Paths outside the source root, under an ignored directory, or in a
    /// top-level `_deleted_history` (which would collide with the history
    /// area) are never mirrored.
    fn is_ignored(&self, path: &Path) -> bool {
        let Some(relative) = self.mapper().relative(path) else {
            debug!("Event outside source root: {}", path.display());
            return true;
        };
        if relative.starts_with(HISTORY_DIR) {
            return true;
        }
        self.ignore.is_ignored(relative)
    }

    fn archive_source(&self, source_path: &Path) -> ArchiveOutcome {
        match self.mapper().to_destination(source_path) {
            Some(destination) => self.archiver.archive(&destination),
            None => ArchiveOutcome::Missing,
        }
    }

    /// Sync every non-ignored file under `dir`. Returns (synced, failed).
    fn sync_dir(&self, dir: &Path) -> (usize, usize) {
        let mut synced = 0;
        let mut failed = 0;

        for entry in walk_files(dir, &self.ignore) {
            match entry {
                Ok((path, _)) => match self.engine.sync(&path) {
                    SyncOutcome::Failed => failed += 1,
                    SyncOutcome::Copied { .. } | SyncOutcome::Unchanged => synced += 1,
                    SyncOutcome::SourceMissing | SyncOutcome::NotAFile => {}
                },
                Err(e) => {
                    warn!("Failed to read directory {}: {}", dir.display(), e);
                    failed += 1;
                }
            }
        }
        (synced, failed)
    }

    /// Sync every file now under `new_dir`, then archive every backup file
    /// still under the old directory's mirror.
    ///
    /// All of those files land in one snapshot keyed by file name, so
    /// same-named files from different subdirectories replace each other
    /// there. `archived` counts every move; the replacements are logged.
    fn rename_dir(&self, old_dir: &Path, new_dir: &Path) -> Reconciled {
        let (synced, mut failed) = self.sync_dir(new_dir);
        let mut archived = 0;
        let mut targets: HashSet<PathBuf> = HashSet::new();
        let mut replaced = 0;

        if let Some(old_mirror) = self.mapper().to_destination(old_dir) {
            if old_mirror.is_dir() {
                for entry in walk_files(&old_mirror, &IgnoreSet::default()) {
                    match entry {
                        Ok((path, _)) => match self.archiver.archive(&path) {
                            ArchiveOutcome::Archived { to } => {
                                archived += 1;
                                if !targets.insert(to) {
                                    replaced += 1;
                                }
                            }
                            ArchiveOutcome::Failed => failed += 1,
                            ArchiveOutcome::Missing | ArchiveOutcome::Skipped => {}
                        },
                        Err(e) => {
                            warn!("Failed to read {}: {}", old_mirror.display(), e);
                            failed += 1;
                        }
                    }
                }
            }
        }

        if replaced > 0 {
            warn!(
                "{} archived file(s) from {} replaced a same-named file in the snapshot",
                replaced,
                old_dir.display()
            );
        }

        Reconciled::RenamedDir {
            synced,
            archived,
            failed,
        }
    }
}
