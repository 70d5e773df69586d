//! Filesystem change events consumed by the reconciliation handler.

use std::path::{Path, PathBuf};

/// A single observed change under a source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Created { path: PathBuf, is_dir: bool },
    Modified { path: PathBuf, is_dir: bool },
    Deleted { path: PathBuf, is_dir: bool },
    Renamed {
        old_path: PathBuf,
        new_path: PathBuf,
        is_dir: bool,
    },
}

impl ChangeEvent {
    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::Created {
            path: path.into(),
            is_dir: false,
        }
    }

    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self::Modified {
            path: path.into(),
            is_dir: false,
        }
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self::Deleted {
            path: path.into(),
            is_dir: false,
        }
    }

    pub fn renamed(old_path: impl Into<PathBuf>, new_path: impl Into<PathBuf>) -> Self {
        Self::Renamed {
            old_path: old_path.into(),
            new_path: new_path.into(),
            is_dir: false,
        }
    }

    /// The path the event is about (the new path for renames).
    pub fn path(&self) -> &Path {
        match self {
            Self::Created { path, .. } | Self::Modified { path, .. } | Self::Deleted { path, .. } => {
                path
            }
            Self::Renamed { new_path, .. } => new_path,
        }
    }

    /// Created and Modified are handled identically (settle, then sync).
    fn is_write(&self) -> bool {
        matches!(self, Self::Created { .. } | Self::Modified { .. })
    }
}

/// Merge adjacent create/modify events for the same path.
///
/// Writers typically produce a burst of notifications per save. Only
/// neighbours are merged, so the relative order of different operations on
/// a path is preserved. The first event of a run is kept.
pub fn coalesce(events: Vec<ChangeEvent>) -> Vec<ChangeEvent> {
    let mut merged: Vec<ChangeEvent> = Vec::with_capacity(events.len());
    for event in events {
        if let Some(last) = merged.last() {
            if last.is_write() && event.is_write() && last.path() == event.path() {
                continue;
            }
        }
        merged.push(event);
    }
    merged
}
