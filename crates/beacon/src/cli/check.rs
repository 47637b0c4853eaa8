use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use console::style;

use super::load_config;

/// Validate a configuration file.
#[derive(Parser)]
pub struct CheckConfigCommand {
    /// Configuration file path (defaults to beacon.toml when present).
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl CheckConfigCommand {
    /// Execute the check-config command.
    pub fn execute(self) -> Result<()> {
        let config = load_config(self.config.as_deref())?;
        config.validate().map_err(|e| anyhow::anyhow!("{}", e))?;

        println!("  {} Configuration is valid", style("✓").green().bold());
        println!();
        print!("{}", config.to_toml().map_err(|e| anyhow::anyhow!("{}", e))?);

        Ok(())
    }
}
