//! Command line arguments.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{BackupPair, VaultConfig};
use crate::error::ConfigError;

#[derive(Parser, Debug)]
#[command(
    name = "echovault",
    version,
    about = "Mirror directories into backups, keeping a history of deleted files"
)]
pub struct Args {
    /// Config file (defaults to <config dir>/echovault/config.toml if present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Additional backup pair, may be repeated
    #[arg(short, long = "pair", value_name = "SOURCE=DESTINATION")]
    pub pairs: Vec<String>,

    /// Delay before copying a created/modified file, in milliseconds
    #[arg(long, value_name = "MS")]
    pub settle_ms: Option<u64>,

    /// Log level or filter directive (overridden by RUST_LOG)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Args {
    /// Merge the arguments over the loaded configuration file.
    pub fn into_config(self) -> Result<VaultConfig, ConfigError> {
        let mut config = VaultConfig::load(self.config.as_deref())?;

        for arg in &self.pairs {
            config.pairs.push(BackupPair::parse_arg(arg)?);
        }
        if let Some(ms) = self.settle_ms {
            config.settle_delay_ms = ms;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }

        config.ensure_pairs()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("vault.toml");
        std::fs::write(
            &file,
            "settle_delay_ms = 50\n[[pairs]]\nsource = \"/a\"\ndestination = \"/b\"\n",
        )
        .unwrap();

        let args = Args::parse_from([
            "echovault",
            "--config",
            file.to_str().unwrap(),
            "--pair",
            "/c=/d",
            "--settle-ms",
            "0",
        ]);
        let config = args.into_config().unwrap();

        assert_eq!(config.pairs.len(), 2);
        assert_eq!(config.pairs[1], BackupPair::new("/c", "/d"));
        assert_eq!(config.settle_delay_ms, 0);
    }

    #[test]
    fn test_missing_pairs_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("empty.toml");
        std::fs::write(&file, "").unwrap();

        let args = Args::parse_from(["echovault", "-c", file.to_str().unwrap()]);
        assert!(matches!(args.into_config(), Err(ConfigError::NoPairs)));
    }
}
