use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::node::ExpiryPolicy;

/// Registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Heartbeat expiry window in milliseconds.
    #[serde(default = "default_expiry_window")]
    pub expiry_window_ms: u64,

    /// Store-level TTL applied on every write (in seconds).
    #[serde(default = "default_store_ttl")]
    pub store_ttl_secs: u64,

    /// Prefix prepended to service names to form store keys.
    #[serde(default)]
    pub key_prefix: String,

    /// How concurrent writers to the same service are handled.
    #[serde(default)]
    pub concurrency: ConcurrencyMode,

    /// Extra attempts after a conditional write conflict.
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
}

impl RegistryConfig {
    /// Expiry policy derived from the configured window.
    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy::new(Duration::from_millis(self.expiry_window_ms))
    }

    /// Store TTL as a duration.
    pub fn store_ttl(&self) -> Duration {
        Duration::from_secs(self.store_ttl_secs)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            expiry_window_ms: default_expiry_window(),
            store_ttl_secs: default_store_ttl(),
            key_prefix: String::new(),
            concurrency: ConcurrencyMode::default(),
            max_conflict_retries: default_max_conflict_retries(),
        }
    }
}

fn default_expiry_window() -> u64 {
    300_000 // 5 minutes
}

fn default_store_ttl() -> u64 {
    24 * 60 * 60 // 24 hours
}

fn default_max_conflict_retries() -> u32 {
    5
}

/// Write strategy for read-modify-write cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyMode {
    /// Optimistic if the store supports conditional writes, otherwise overwrite.
    #[default]
    Auto,

    /// Unconditional writes; the last writer wins.
    Overwrite,

    /// Versioned conditional writes with bounded retry on conflict.
    Optimistic,
}

impl ConcurrencyMode {
    /// Resolve `Auto` against what the store offers.
    pub fn resolve(self, conditional_writes: bool) -> Self {
        match self {
            Self::Auto if conditional_writes => Self::Optimistic,
            Self::Auto => Self::Overwrite,
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Overwrite => "overwrite",
            Self::Optimistic => "optimistic",
        }
    }
}
