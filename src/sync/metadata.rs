//! Cheap size + mtime comparison used during bulk scans.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Absorbs timestamp resolution differences between filesystems
/// (FAT stores mtime at 2s granularity, others at 1ns).
pub const MTIME_TOLERANCE: Duration = Duration::from_secs(1);

/// What is known about a file at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdentity {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

impl FileIdentity {
    pub fn from_metadata(path: &Path, metadata: &Metadata) -> Self {
        Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            modified: metadata.modified().ok(),
        }
    }

    pub fn stat(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        Ok(Self::from_metadata(path, &metadata))
    }
}

/// Heuristic: same size and mtimes within [`MTIME_TOLERANCE`].
///
/// Never proof of equality. Only the initial scan may act on it.
pub fn likely_unchanged(source: &FileIdentity, destination: &FileIdentity) -> bool {
    if source.size != destination.size {
        return false;
    }
    match (source.modified, destination.modified) {
        (Some(src), Some(dst)) => mtime_delta(src, dst) < MTIME_TOLERANCE,
        _ => false,
    }
}

fn mtime_delta(a: SystemTime, b: SystemTime) -> Duration {
    a.duration_since(b)
        .or_else(|_| b.duration_since(a))
        .unwrap_or(Duration::MAX)
}
