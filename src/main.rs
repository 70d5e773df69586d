use anyhow::{bail, Result};
use clap::Parser;
use tracing::info;

use echovault::cli::Args;
use echovault::logging;
use echovault::vault::Vault;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Args::parse().into_config()?;
    logging::init(&config.log_level);

    info!("--- EchoVault Backup Sentinel ---");
    for pair in &config.pairs {
        info!("Configured: {} -> {}", pair.source.display(), pair.destination.display());
    }

    let running = Vault::new(config).start();
    if running.active_pairs() == 0 {
        bail!("No backup pair could be started");
    }

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received, stopping");

    tokio::task::spawn_blocking(move || running.stop()).await?;
    Ok(())
}
