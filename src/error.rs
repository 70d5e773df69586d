//! Error types for configuration and pair validation.
//!
//! The reconciliation core itself never returns these: per-file failures
//! are logged where they happen. Only startup can fail.

use std::path::PathBuf;
use thiserror::Error;

/// Errors loading the vault configuration as a whole.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid pair argument '{arg}': expected SOURCE=DESTINATION")]
    PairArgument { arg: String },

    #[error("No backup pairs configured")]
    NoPairs,
}

/// Errors that disqualify a single backup pair. Other pairs still start.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PairError {
    #[error("Source path not found: {path}")]
    SourceMissing { path: PathBuf },

    #[error("Source is not a directory: {path}")]
    SourceNotDirectory { path: PathBuf },

    #[error("Path must be absolute: {path}")]
    NotAbsolute { path: PathBuf },

    #[error("Destination {destination} lies inside source {source_root}")]
    DestinationInsideSource {
        source_root: PathBuf,
        destination: PathBuf,
    },
}
