//! Reconciliation core.
//!
//! One-way mirroring of a source tree into a backup tree. Content that
//! leaves the live backup is moved into a timestamped history area instead
//! of being deleted.

pub mod archive;
pub mod engine;
pub mod event;
pub mod fingerprint;
pub mod fsops;
pub mod handler;
pub mod ignore;
pub mod metadata;
pub mod paths;
pub mod scanner;

pub use archive::{ArchiveOutcome, Clock, HistoryArchiver, LocalClock};
pub use engine::{SyncEngine, SyncOutcome};
pub use event::{coalesce, ChangeEvent};
pub use fingerprint::{files_equal, fingerprint, Equality, Fingerprint};
pub use handler::{ReconcileHandler, Reconciled, Settle};
pub use ignore::IgnoreSet;
pub use metadata::{likely_unchanged, FileIdentity};
pub use paths::{to_destination, PathMapper, HISTORY_DIR};
pub use scanner::ScanReport;
