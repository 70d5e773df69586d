//! Root orchestration.
//!
//! Each configured pair gets its own worker thread. A worker runs the
//! initial scan to completion, only then subscribes to live events, and
//! processes them one at a time in arrival order until the vault stops.
//! Workers share nothing mutable.

use crossbeam_channel::{bounded, select, tick, Receiver, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::config::{BackupPair, VaultConfig};
use crate::sync::event::{coalesce, ChangeEvent};
use crate::sync::handler::{ReconcileHandler, Settle};
use crate::sync::ignore::IgnoreSet;
use crate::sync::scanner;
use crate::watcher::{EventTranslator, PairWatcher, RENAME_PAIRING_WINDOW};

/// Configured, not yet running.
pub struct Vault {
    config: VaultConfig,
}

impl Vault {
    pub fn new(config: VaultConfig) -> Self {
        Self { config }
    }

    /// Validate pairs and spawn one worker per valid pair. Invalid pairs are
    /// logged and skipped.
    pub fn start(self) -> RunningVault {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        let ignore = self.config.ignore_set();
        let settle = Settle::new(self.config.settle_delay());
        let mut workers = Vec::new();

        for (index, pair) in self.config.pairs.iter().enumerate() {
            let pair = match pair.validate() {
                Ok(pair) => pair,
                Err(e) => {
                    error!("Skipping pair {} -> {}: {}", pair.source.display(), pair.destination.display(), e);
                    continue;
                }
            };

            let ignore = ignore.clone();
            let shutdown = shutdown_rx.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("pair-{index}"))
                .spawn(move || run_pair(pair, ignore, settle, shutdown));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => error!("Failed to start worker for pair {index}: {e}"),
            }
        }

        RunningVault {
            shutdown: Some(shutdown_tx),
            workers,
        }
    }
}

/// Handle to the running workers.
pub struct RunningVault {
    shutdown: Option<Sender<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl RunningVault {
    /// Number of pairs that started.
    pub fn active_pairs(&self) -> usize {
        self.workers.len()
    }

    /// Stop accepting events and wait for in-flight work to finish.
    pub fn stop(mut self) {
        self.shutdown.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("Pair worker panicked");
            }
        }
        info!("Stopped");
    }
}

fn stopping(shutdown: &Receiver<()>) -> bool {
    matches!(shutdown.try_recv(), Err(TryRecvError::Disconnected))
}

fn run_pair(pair: BackupPair, ignore: IgnoreSet, settle: Settle, shutdown: Receiver<()>) {
    let handler = ReconcileHandler::new(&pair, ignore, settle);

    scanner::run(&handler);
    if stopping(&shutdown) {
        return;
    }

    let watcher = match PairWatcher::subscribe(&pair.source) {
        Ok(watcher) => watcher,
        Err(e) => {
            error!("Failed to watch {}: {:#}", pair.source.display(), e);
            return;
        }
    };
    info!("Watching: {} -> {}", watcher.root().display(), pair.destination.display());

    let mut translator = EventTranslator::new();
    let ticker = tick(RENAME_PAIRING_WINDOW);

    loop {
        let keep_running = select! {
            recv(watcher.events()) -> msg => match msg {
                Ok(first) => {
                    let mut batch = Vec::new();
                    collect(&mut translator, first, &mut batch);
                    while let Ok(next) = watcher.events().try_recv() {
                        collect(&mut translator, next, &mut batch);
                    }
                    dispatch(&handler, coalesce(batch), &shutdown)
                }
                Err(_) => false,
            },
            recv(ticker) -> _ => {
                let expired = translator.flush_expired(Instant::now());
                dispatch(&handler, expired, &shutdown)
            },
            recv(shutdown) -> _ => false,
        };
        if !keep_running {
            break;
        }
    }

    info!("Stopped watching: {}", pair.source.display());
}

fn collect(
    translator: &mut EventTranslator,
    raw: notify::Result<notify::Event>,
    batch: &mut Vec<ChangeEvent>,
) {
    match raw {
        Ok(event) => batch.extend(translator.translate(event, Instant::now())),
        Err(e) => warn!("Watch error: {}", e),
    }
}

/// Handle events in order; returns false once shutdown was requested.
fn dispatch(handler: &ReconcileHandler, events: Vec<ChangeEvent>, shutdown: &Receiver<()>) -> bool {
    for event in events {
        if stopping(shutdown) {
            return false;
        }
        handler.handle(&event);
    }
    true
}
