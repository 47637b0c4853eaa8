use std::path::PathBuf;

use anyhow::Result;
use beacon_core::config::BeaconConfig;
use clap::Parser;
use console::style;
use tracing::info;

use beacon::{init_logging, Beacon};

use super::load_config;

/// Run the BEACON registry server.
#[derive(Parser)]
pub struct RunCommand {
    /// Configuration file path (defaults to beacon.toml when present).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Port to listen on (overrides config).
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    pub host: Option<String>,

    /// Enable development mode (verbose logging).
    #[arg(long)]
    pub dev: bool,
}

impl RunCommand {
    /// Execute the run command.
    pub async fn execute(self) -> Result<()> {
        let mut config = load_config(self.config.as_deref())?;
        self.apply_overrides(&mut config);

        init_logging(&config.logging).map_err(|e| anyhow::anyhow!(e))?;

        println!();
        println!(
            "  {}  {} v{}",
            style("◉").bold(),
            style("BEACON").bold().cyan(),
            env!("CARGO_PKG_VERSION")
        );
        println!();

        if let Some(path) = &self.config {
            info!("Loaded configuration from {}", path.display());
        }

        println!(
            "  {} Listening on {}",
            style("→").bold(),
            style(format!("http://{}:{}", config.gateway.host, config.gateway.port)).cyan()
        );
        println!(
            "  {} Expiry window {} ms",
            style("→").bold(),
            config.registry.expiry_window_ms
        );
        if self.dev {
            println!("  {} Development mode enabled", style("→").bold());
        }
        println!();

        let beacon = Beacon::builder()
            .config(config)
            .build()
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        beacon.run().await.map_err(|e| anyhow::anyhow!("{}", e))?;

        println!("\n  {} Stopped", style("◉").bold());

        Ok(())
    }

    fn apply_overrides(&self, config: &mut BeaconConfig) {
        if let Some(port) = self.port {
            config.gateway.port = port;
        }
        if let Some(host) = &self.host {
            config.gateway.host = host.clone();
        }
        if self.dev {
            config.logging.level = "debug".to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_command_defaults() {
        let cmd = RunCommand::try_parse_from(["run"]).unwrap();
        assert!(cmd.config.is_none());
        assert!(cmd.port.is_none());
        assert!(!cmd.dev);
    }

    #[test]
    fn test_run_command_with_overrides() {
        let cmd = RunCommand {
            config: None,
            port: Some(3000),
            host: Some("0.0.0.0".to_string()),
            dev: true,
        };

        let mut config = BeaconConfig::default();
        cmd.apply_overrides(&mut config);
        assert_eq!(config.gateway.port, 3000);
        assert_eq!(config.gateway.host, "0.0.0.0");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_run_command_keeps_config_without_overrides() {
        let cmd = RunCommand::try_parse_from(["run"]).unwrap();
        let mut config = BeaconConfig::default();
        config.gateway.port = 9100;

        cmd.apply_overrides(&mut config);
        assert_eq!(config.gateway.port, 9100);
        assert_eq!(config.logging.level, "info");
    }
}
