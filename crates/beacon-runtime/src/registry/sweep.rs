use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use beacon_core::Result;

use super::ledger::ServiceLedger;

/// A service whose cleanup failed during a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepFailure {
    /// Service name.
    pub service: String,
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
}

/// Outcome of a full sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// When the sweep started.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,
    /// Services enumerated.
    pub services_scanned: usize,
    /// Live nodes left across all services.
    pub active_nodes: usize,
    /// Nodes dropped by this sweep.
    pub expired_nodes: usize,
    /// Services deleted because no node was live.
    pub services_deleted: usize,
    /// Services whose cleanup failed.
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            services_scanned: 0,
            active_nodes: 0,
            expired_nodes: 0,
            services_deleted: 0,
            failures: Vec::new(),
        }
    }

    /// Whether every service was compacted.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Enumerates every service in the store and compacts each one.
///
/// Runs on the health signal only, never on the register/discover path.
#[derive(Clone)]
pub struct SweepCoordinator {
    ledger: Arc<ServiceLedger>,
}

impl SweepCoordinator {
    /// Create a coordinator over a ledger.
    pub fn new(ledger: Arc<ServiceLedger>) -> Self {
        Self { ledger }
    }

    /// Compact every service, isolating per-service failures.
    ///
    /// Only a failure to enumerate keys is returned as an error.
    pub async fn sweep_all(&self) -> Result<SweepReport> {
        let mut report = SweepReport::new(self.ledger.clock().now());
        let prefix = self.ledger.config().key_prefix.as_str();
        let keys = self.ledger.store().list(prefix).await?;

        for key in &keys {
            let Some(service) = self.ledger.service_for_key(key) else {
                continue;
            };
            report.services_scanned += 1;

            match self.ledger.expire_and_compact(service).await {
                Ok(compaction) => {
                    report.active_nodes += compaction.active.len();
                    report.expired_nodes += compaction.expired;
                    if compaction.deleted {
                        report.services_deleted += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(service, error = %e, "Sweep failed for service");
                    report.failures.push(SweepFailure {
                        service: service.to_string(),
                        code: e.kind().as_code().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if report.is_clean() {
            tracing::info!(
                scanned = report.services_scanned,
                expired = report.expired_nodes,
                deleted = report.services_deleted,
                "Sweep complete"
            );
        } else {
            tracing::warn!(
                scanned = report.services_scanned,
                expired = report.expired_nodes,
                deleted = report.services_deleted,
                failed = report.failures.len(),
                "Sweep completed with failures"
            );
        }

        Ok(report)
    }
}
