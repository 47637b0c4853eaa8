//! BEACON - heartbeat-driven service registry
//!
//! Single binary runtime that provides:
//! - Register / heartbeat / discover / unregister over HTTP
//! - Lazy expiry of nodes that stop sending heartbeats
//! - Sweep of every service on the health signal

use std::sync::Arc;

use tokio::sync::broadcast;

use beacon_core::config::{BeaconConfig, LoggingConfig, StoreBackend, StoreConfig};
use beacon_core::error::Result;
use beacon_core::store::KvStore;
use beacon_core::{Clock, SystemClock};
use beacon_runtime::{GatewayServer, MemoryStore, Registry};

/// Prelude module for common imports.
pub mod prelude {
    pub use beacon_core::config::{BeaconConfig, ConcurrencyMode, RegistryConfig};
    pub use beacon_core::error::{BeaconError, ErrorKind, Result};
    pub use beacon_core::store::{CasOutcome, KvStore, StoreFuture, StoredValue};
    pub use beacon_core::{Clock, ExpiryPolicy, HeartbeatOutcome, NodeRecord, SystemClock};
    pub use beacon_runtime::registry::{DiscoverRequest, NodeRequest};
    pub use beacon_runtime::{MemoryStore, Registry, SweepReport};

    pub use crate::{Beacon, BeaconBuilder};
}

/// The main BEACON runtime.
pub struct Beacon {
    config: BeaconConfig,
    registry: Registry,
    shutdown_tx: broadcast::Sender<()>,
}

impl Beacon {
    /// Create a new builder for configuring BEACON.
    pub fn builder() -> BeaconBuilder {
        BeaconBuilder::new()
    }

    /// Get the configuration.
    pub fn config(&self) -> &BeaconConfig {
        &self.config
    }

    /// Get the registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run the gateway until ctrl-c or [`Beacon::shutdown`].
    pub async fn run(self) -> Result<()> {
        let registry = &self.config.registry;
        tracing::info!(
            expiry_window_ms = registry.expiry_window_ms,
            store_ttl_secs = registry.store_ttl_secs,
            concurrency = self.registry.ledger().mode().as_str(),
            "Starting BEACON"
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let shutdown = async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received shutdown signal");
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Received shutdown notification");
                }
            }
        };

        let server = GatewayServer::new(self.config.gateway.clone(), self.registry.clone());
        server.run(shutdown).await?;

        tracing::info!("BEACON runtime stopped");
        Ok(())
    }

    /// Request shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Builder for configuring the BEACON runtime.
pub struct BeaconBuilder {
    config: Option<BeaconConfig>,
    store: Option<Arc<dyn KvStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl BeaconBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: None,
            store: None,
            clock: None,
        }
    }

    /// Set the configuration.
    pub fn config(mut self, config: BeaconConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use an existing store instead of the configured backend.
    pub fn store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a custom clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the BEACON runtime.
    pub fn build(self) -> Result<Beacon> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let store = self
            .store
            .unwrap_or_else(|| build_store(&config.store, clock.clone()));
        let registry = Registry::new(store, clock, &config.registry)?;

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Beacon {
            config,
            registry,
            shutdown_tx,
        })
    }
}

impl Default for BeaconBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Instantiate the configured store backend.
fn build_store(config: &StoreConfig, clock: Arc<dyn Clock>) -> Arc<dyn KvStore> {
    match config.backend {
        StoreBackend::Memory => Arc::new(
            MemoryStore::with_clock(clock).conditional_writes(config.conditional_writes),
        ),
    }
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LoggingConfig) -> std::result::Result<(), String> {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let result = if config.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    result.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::config::ConcurrencyMode;
    use beacon_runtime::registry::NodeRequest;

    #[test]
    fn test_beacon_builder_new() {
        let builder = BeaconBuilder::new();
        assert!(builder.config.is_none());
    }

    #[test]
    fn test_beacon_builder_defaults() {
        let beacon = BeaconBuilder::new().build().unwrap();
        assert_eq!(beacon.config().gateway.port, 8787);
        assert_eq!(
            beacon.registry().ledger().mode(),
            ConcurrencyMode::Optimistic
        );
    }

    #[test]
    fn test_beacon_builder_plain_store() {
        let mut config = BeaconConfig::default();
        config.store.conditional_writes = false;

        let beacon = BeaconBuilder::new().config(config).build().unwrap();
        assert_eq!(beacon.registry().ledger().mode(), ConcurrencyMode::Overwrite);
    }

    #[test]
    fn test_beacon_builder_rejects_optimistic_on_plain_store() {
        let mut config = BeaconConfig::default();
        config.store.conditional_writes = false;
        config.registry.concurrency = ConcurrencyMode::Optimistic;

        assert!(BeaconBuilder::new().config(config).build().is_err());
    }

    #[test]
    fn test_beacon_builder_rejects_invalid_config() {
        let mut config = BeaconConfig::default();
        config.registry.expiry_window_ms = 0;
        assert!(BeaconBuilder::new().config(config).build().is_err());
    }

    #[tokio::test]
    async fn test_beacon_with_custom_store() {
        let store = Arc::new(MemoryStore::new());
        let beacon = BeaconBuilder::new().store(store.clone()).build().unwrap();

        beacon
            .registry()
            .register_or_renew(&NodeRequest::new("a", "10.0.0.1"))
            .await
            .unwrap();
        assert_eq!(store.len(), 1);
    }
}
