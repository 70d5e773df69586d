// Library module for echovault
// Re-exports modules for use in integration tests and the binary

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod sync;
pub mod vault;
pub mod watcher;
