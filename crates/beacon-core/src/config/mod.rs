mod registry;

pub use registry::{ConcurrencyMode, RegistryConfig};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{BeaconError, Result};

/// Root configuration for BEACON.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BeaconConfig {
    /// Liveness and store layout.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Store backend.
    #[serde(default)]
    pub store: StoreConfig,

    /// HTTP gateway.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BeaconConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| BeaconError::Config(format!("Failed to read config file: {}", e)))?;

        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let content = substitute_env_vars(content);

        let config: Self = toml::from_str(&content)
            .map_err(|e| BeaconError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| BeaconError::Serialization(e.to_string()))
    }

    /// Reject settings the registry cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.registry.expiry_window_ms == 0 {
            return Err(BeaconError::Config(
                "registry.expiry_window_ms must be greater than zero".to_string(),
            ));
        }

        if self.registry.store_ttl() <= self.registry.expiry_policy().window() {
            return Err(BeaconError::Config(format!(
                "registry.store_ttl_secs ({}s) must exceed the expiry window ({}ms)",
                self.registry.store_ttl_secs, self.registry.expiry_window_ms
            )));
        }

        if self.gateway.port == 0 {
            return Err(BeaconError::Config(
                "gateway.port must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Store backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend kind.
    #[serde(default)]
    pub backend: StoreBackend,

    /// Whether the backend should offer versioned conditional writes.
    #[serde(default = "default_true")]
    pub conditional_writes: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            conditional_writes: true,
        }
    }
}

/// Available store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local store.
    #[default]
    Memory,
}

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port.
    #[serde(default = "default_http_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_http_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    8787
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output JSON format.
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

static ENV_VAR: Lazy<regex_lite::Regex> = Lazy::new(|| {
    regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid env var pattern")
});

/// Substitute environment variables in the format ${VAR_NAME}.
fn substitute_env_vars(content: &str) -> String {
    let mut result = content.to_string();

    for cap in ENV_VAR.captures_iter(content) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}
