//! Sync engine for one-way mirroring.
//!
//! Ensures the backup holds an up-to-date copy of a single source file.
//! Content equality is decided by fingerprint, never by metadata alone, and
//! anything short of proven equality results in a fresh copy.

use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, error, info};

use super::fingerprint::{files_equal, Equality};
use super::fsops;
use super::paths::PathMapper;

/// What a sync call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Copied { bytes: u64 },
    /// Destination already holds identical content.
    Unchanged,
    /// Source disappeared before it could be processed.
    SourceMissing,
    /// Source exists but is not a regular file.
    NotAFile,
    Failed,
}

impl SyncOutcome {
    pub fn is_copied(&self) -> bool {
        matches!(self, Self::Copied { .. })
    }
}

/// Copies changed source files into the backup tree of one pair.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    mapper: PathMapper,
}

impl SyncEngine {
    pub fn new(mapper: PathMapper) -> Self {
        Self { mapper }
    }

    pub fn mapper(&self) -> &PathMapper {
        &self.mapper
    }

    /// Bring the backup copy of `source_path` in line with the source.
    ///
    /// Never fails outward: errors are logged and reported as
    /// [`SyncOutcome::Failed`].
    pub fn sync(&self, source_path: &Path) -> SyncOutcome {
        match std::fs::metadata(source_path) {
            Ok(metadata) if !metadata.is_file() => return SyncOutcome::NotAFile,
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Source vanished before sync: {}", source_path.display());
                return SyncOutcome::SourceMissing;
            }
            Err(e) => {
                error!("Failed to sync {}: {}", source_path.display(), e);
                return SyncOutcome::Failed;
            }
        }

        let Some(destination) = self.mapper.to_destination(source_path) else {
            error!(
                "Failed to sync {}: not under source root {}",
                source_path.display(),
                self.mapper.source_root().display()
            );
            return SyncOutcome::Failed;
        };

        if destination.exists() {
            match files_equal(source_path, &destination) {
                Equality::Equal => {
                    debug!("Unchanged: {}", source_path.display());
                    return SyncOutcome::Unchanged;
                }
                Equality::Indeterminate => {
                    debug!("Cannot compare {}, copying", source_path.display());
                }
                Equality::Different => {}
            }
        }

        match fsops::copy_with_metadata(source_path, &destination) {
            Ok(bytes) => {
                info!("SYNCED: {} -> {}", source_path.display(), destination.display());
                SyncOutcome::Copied { bytes }
            }
            Err(e) => {
                // The copy may have vanished mid-flight
                if !source_path.exists() {
                    debug!("Source vanished during sync: {}", source_path.display());
                    return SyncOutcome::SourceMissing;
                }
                error!(
                    "Failed to sync {} -> {}: {:#}",
                    source_path.display(),
                    destination.display(),
                    e
                );
                SyncOutcome::Failed
            }
        }
    }
}
