//! Initial full-tree sync.
//!
//! Walks the source root once at startup and feeds every file through the
//! handler's fast path, so the backup has a consistent baseline before live
//! events are trusted. Files whose backup matches by size and mtime are not
//! hashed; a same-size, same-mtime content change is only caught by a later
//! live event.

use humansize::{format_size, DECIMAL};
use jwalk::WalkDir;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::archive::ArchiveOutcome;
use super::engine::SyncOutcome;
use super::handler::{ReconcileHandler, Reconciled};
use super::ignore::IgnoreSet;

/// Counters for one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub files_seen: usize,
    pub copied: usize,
    /// Passed the size + mtime check without hashing.
    pub skipped: usize,
    /// Hashed and found identical.
    pub unchanged: usize,
    pub vanished: usize,
    pub failed: usize,
    pub bytes_copied: u64,
    pub duration: Duration,
}

impl ScanReport {
    fn record(&mut self, outcome: &Reconciled) {
        match outcome {
            Reconciled::Skipped => self.skipped += 1,
            Reconciled::Synced(SyncOutcome::Copied { bytes }) => {
                self.copied += 1;
                self.bytes_copied += bytes;
            }
            Reconciled::Synced(SyncOutcome::Unchanged) => self.unchanged += 1,
            Reconciled::Synced(SyncOutcome::SourceMissing | SyncOutcome::NotAFile) => {
                self.vanished += 1
            }
            Reconciled::Synced(SyncOutcome::Failed)
            | Reconciled::Archived(ArchiveOutcome::Failed) => self.failed += 1,
            _ => {}
        }
    }
}

/// Regular files under `root`, skipping any directory whose name is in
/// `ignore` before it is read.
pub fn walk_files(
    root: &Path,
    ignore: &IgnoreSet,
) -> impl Iterator<Item = Result<(PathBuf, Metadata), jwalk::Error>> {
    let ignore = ignore.clone();
    WalkDir::new(root)
        .skip_hidden(false)
        .follow_links(false)
        .sort(true)
        .process_read_dir(move |_depth, _path, _state, children| {
            children.retain(|child| match child {
                Ok(entry) => !(entry.file_type.is_dir() && ignore.contains(&entry.file_name)),
                Err(_) => true,
            });
        })
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_file() => {
                Some(entry.metadata().map(|metadata| (entry.path(), metadata)))
            }
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
}

/// Run the initial sync for the handler's pair.
pub fn run(handler: &ReconcileHandler) -> ScanReport {
    let start = Instant::now();
    let root = handler.mapper().source_root().to_path_buf();
    let mut report = ScanReport::default();

    info!("Initial sync: {} -> {}", root.display(), handler.mapper().destination_root().display());

    for entry in walk_files(&root, handler.ignore()) {
        match entry {
            Ok((path, metadata)) => {
                report.files_seen += 1;
                let outcome = handler.scan_entry(&path, &metadata);
                report.record(&outcome);
            }
            Err(e) => {
                warn!("Scan error under {}: {}", root.display(), e);
                report.failed += 1;
            }
        }
    }

    report.duration = start.elapsed();
    info!(
        "Initial sync of {} done: {} files, {} copied ({}), {} skipped, {} unchanged, {} failed in {:.2}s",
        root.display(),
        report.files_seen,
        report.copied,
        format_size(report.bytes_copied, DECIMAL),
        report.skipped,
        report.unchanged,
        report.failed,
        report.duration.as_secs_f64()
    );
    report
}
