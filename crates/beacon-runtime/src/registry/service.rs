use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use beacon_core::config::RegistryConfig;
use beacon_core::store::KvStore;
use beacon_core::{Clock, HeartbeatOutcome, NodeRecord, Result};

use super::ledger::{LedgerConfig, ServiceLedger};
use super::request::{DiscoverRequest, NodeRequest};
use super::sweep::{SweepCoordinator, SweepReport};

/// Payload of register-or-renew.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatReceipt {
    pub service: String,
    pub address: String,
    pub outcome: HeartbeatOutcome,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_heartbeat: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub next_deadline: DateTime<Utc>,
}

/// Payload of discover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Discovery {
    pub service: String,
    pub active_count: usize,
    pub nodes: Vec<NodeRecord>,
}

/// Payload of unregister.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Removal {
    pub service: String,
    pub address: String,
    pub remaining: usize,
}

/// Payload of the health signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub expiry_window_ms: i64,
    pub store_ttl_secs: u64,
    pub concurrency: String,
    pub sweep: SweepReport,
}

/// The registry's external operations.
///
/// Input is validated before any store access; each operation then maps onto
/// exactly one ledger call (the health signal onto one sweep).
#[derive(Clone)]
pub struct Registry {
    ledger: Arc<ServiceLedger>,
    sweeper: SweepCoordinator,
}

impl Registry {
    /// Build a registry over a store.
    pub fn new(
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        config: &RegistryConfig,
    ) -> Result<Self> {
        let ledger = ServiceLedger::new(store, clock, LedgerConfig::from(config))?;
        Ok(Self::from_ledger(Arc::new(ledger)))
    }

    /// Build a registry over an existing ledger.
    pub fn from_ledger(ledger: Arc<ServiceLedger>) -> Self {
        let sweeper = SweepCoordinator::new(ledger.clone());
        Self { ledger, sweeper }
    }

    /// Underlying ledger.
    pub fn ledger(&self) -> &Arc<ServiceLedger> {
        &self.ledger
    }

    /// Register a node or renew its heartbeat.
    pub async fn register_or_renew(&self, request: &NodeRequest) -> Result<HeartbeatReceipt> {
        let (service, address) = request.validate()?;
        let beat = self.ledger.upsert_heartbeat(&service, &address).await?;

        Ok(HeartbeatReceipt {
            service,
            address,
            outcome: beat.outcome,
            last_heartbeat: beat.record.last_heartbeat,
            next_deadline: beat.deadline,
        })
    }

    /// List the live nodes of a service.
    pub async fn discover(&self, request: &DiscoverRequest) -> Result<Discovery> {
        let service = request.validate()?;
        let nodes = self.ledger.list_active(&service).await?;

        Ok(Discovery {
            service,
            active_count: nodes.len(),
            nodes,
        })
    }

    /// Remove a node.
    pub async fn unregister(&self, request: &NodeRequest) -> Result<Removal> {
        let (service, address) = request.validate()?;
        let removed = self.ledger.remove_node(&service, &address).await?;

        Ok(Removal {
            service,
            address,
            remaining: removed.remaining,
        })
    }

    /// Sweep all services and report the liveness configuration.
    pub async fn health(&self) -> Result<HealthReport> {
        let sweep = self.sweeper.sweep_all().await?;
        let config = self.ledger.config();

        Ok(HealthReport {
            status: "healthy".to_string(),
            timestamp: self.ledger.clock().now(),
            expiry_window_ms: config.expiry.window_ms(),
            store_ttl_secs: config.store_ttl.as_secs(),
            concurrency: self.ledger.mode().as_str().to_string(),
            sweep,
        })
    }
}
