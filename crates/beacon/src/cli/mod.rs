mod check;
mod run;

pub use check::CheckConfigCommand;
pub use run::RunCommand;

use std::path::Path;

use anyhow::{Context, Result};
use beacon_core::config::BeaconConfig;
use clap::{Parser, Subcommand};

/// Configuration file looked up when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "beacon.toml";

/// BEACON - heartbeat-driven service registry
#[derive(Parser)]
#[command(name = "beacon")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run the registry server.
    Run(RunCommand),

    /// Validate a configuration file and print the effective settings.
    CheckConfig(CheckConfigCommand),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run(cmd) => cmd.execute().await,
            Commands::CheckConfig(cmd) => cmd.execute(),
        }
    }
}

/// Load an explicit config file, or `beacon.toml` if present, or defaults.
pub fn load_config(path: Option<&Path>) -> Result<BeaconConfig> {
    match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            BeaconConfig::from_file(path)
                .with_context(|| format!("Invalid configuration in {}", path.display()))
        }
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.exists() {
                BeaconConfig::from_file(default)
                    .with_context(|| format!("Invalid configuration in {}", DEFAULT_CONFIG_FILE))
            } else {
                Ok(BeaconConfig::default())
            }
        }
    }
}
