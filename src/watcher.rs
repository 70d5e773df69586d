//! File system watcher for live mirroring.
//!
//! Wraps a recursive `notify` watcher whose raw events are delivered over a
//! crossbeam channel, and translates them into [`ChangeEvent`]s.
//!
//! Renames arrive differently per backend. inotify reports a `From` half,
//! a `To` half sharing a tracker cookie, and then a combined `Both` event;
//! Windows reports `From`/`To` back to back without a cookie; FSEvents
//! reports `Any` for each side. A move out of the watched tree produces only
//! a `From` (so it is a delete), and a move in only a `To` (so a create).

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver};
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::sync::event::ChangeEvent;

/// How long an unmatched rename `From` waits for its `To`.
pub const RENAME_PAIRING_WINDOW: Duration = Duration::from_millis(500);

/// Trackers already emitted as renames, to drop the trailing `Both`.
const CONSUMED_TRACKERS: usize = 64;

/// Live subscription to one source root.
pub struct PairWatcher {
    _watcher: RecommendedWatcher,
    receiver: Receiver<notify::Result<Event>>,
    root: PathBuf,
}

impl PairWatcher {
    /// Start watching `root` recursively.
    pub fn subscribe(root: &Path) -> Result<Self> {
        let (tx, rx) = unbounded();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = tx.send(res);
            },
            Config::default().with_poll_interval(Duration::from_secs(1)),
        )?;
        watcher.watch(root, RecursiveMode::Recursive)?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            root: root.to_path_buf(),
        })
    }

    /// Raw notify events, for use in a `select!`.
    pub fn events(&self) -> &Receiver<notify::Result<Event>> {
        &self.receiver
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[derive(Debug)]
struct PendingFrom {
    path: PathBuf,
    tracker: Option<usize>,
    is_dir: bool,
    since: Instant,
}

/// Stateful notify → [`ChangeEvent`] translation for one pair.
#[derive(Debug, Default)]
pub struct EventTranslator {
    pending: VecDeque<PendingFrom>,
    consumed: VecDeque<usize>,
}

impl EventTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate one raw event. May also flush expired rename sources.
    pub fn translate(&mut self, event: Event, now: Instant) -> Vec<ChangeEvent> {
        let mut out = self.flush_expired(now);
        let tracker = event.tracker();
        let mut paths = event.paths;

        match event.kind {
            EventKind::Create(kind) => {
                for path in paths {
                    let is_dir = match kind {
                        CreateKind::Folder => true,
                        CreateKind::File => false,
                        _ => path.is_dir(),
                    };
                    out.push(ChangeEvent::Created { path, is_dir });
                }
            }
            EventKind::Modify(ModifyKind::Name(mode)) => match mode {
                RenameMode::Both if paths.len() == 2 => {
                    if tracker.is_some_and(|t| self.consumed.contains(&t)) {
                        return out;
                    }
                    let new_path = paths.pop().unwrap_or_default();
                    let old_path = paths.pop().unwrap_or_default();
                    self.pending.retain(|p| p.path != old_path);
                    out.push(renamed(old_path, new_path));
                }
                RenameMode::From => {
                    for path in paths {
                        let is_dir = path.is_dir();
                        self.pending.push_back(PendingFrom {
                            path,
                            tracker,
                            is_dir,
                            since: now,
                        });
                    }
                }
                RenameMode::To => {
                    for path in paths {
                        match self.take_pending(tracker) {
                            Some(from) => {
                                if let Some(t) = tracker {
                                    self.consume(t);
                                }
                                out.push(renamed(from.path, path));
                            }
                            None => {
                                let is_dir = path.is_dir();
                                out.push(ChangeEvent::Created { path, is_dir });
                            }
                        }
                    }
                }
                _ => {
                    for path in paths {
                        out.push(existence_event(path));
                    }
                }
            },
            EventKind::Modify(_) => {
                for path in paths {
                    let is_dir = path.is_dir();
                    out.push(ChangeEvent::Modified { path, is_dir });
                }
            }
            EventKind::Remove(kind) => {
                for path in paths {
                    let is_dir = matches!(kind, RemoveKind::Folder);
                    out.push(ChangeEvent::Deleted { path, is_dir });
                }
            }
            EventKind::Access(_) | EventKind::Any | EventKind::Other => {}
        }
        out
    }

    /// Rename sources that found no destination in time left the tree.
    pub fn flush_expired(&mut self, now: Instant) -> Vec<ChangeEvent> {
        let mut out = Vec::new();
        while let Some(front) = self.pending.front() {
            if now.saturating_duration_since(front.since) < RENAME_PAIRING_WINDOW {
                break;
            }
            if let Some(from) = self.pending.pop_front() {
                out.push(ChangeEvent::Deleted {
                    path: from.path,
                    is_dir: from.is_dir,
                });
            }
        }
        out
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn take_pending(&mut self, tracker: Option<usize>) -> Option<PendingFrom> {
        let index = match tracker {
            Some(t) => self.pending.iter().position(|p| p.tracker == Some(t))?,
            None => self.pending.iter().rposition(|p| p.tracker.is_none())?,
        };
        self.pending.remove(index)
    }

    fn consume(&mut self, tracker: usize) {
        if self.consumed.len() == CONSUMED_TRACKERS {
            self.consumed.pop_front();
        }
        self.consumed.push_back(tracker);
    }
}

fn renamed(old_path: PathBuf, new_path: PathBuf) -> ChangeEvent {
    let is_dir = new_path.is_dir();
    ChangeEvent::Renamed {
        old_path,
        new_path,
        is_dir,
    }
}

/// For backends that cannot say which side of a rename a path is on.
fn existence_event(path: PathBuf) -> ChangeEvent {
    match std::fs::symlink_metadata(&path) {
        Ok(metadata) => ChangeEvent::Modified {
            path,
            is_dir: metadata.is_dir(),
        },
        Err(_) => ChangeEvent::Deleted {
            path,
            is_dir: false,
        },
    }
}
