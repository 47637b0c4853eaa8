mod ledger;
mod request;
mod service;
mod sweep;

pub use ledger::{Compaction, Heartbeat, LedgerConfig, Removed, ServiceLedger};
pub use request::{DiscoverRequest, NodeRequest};
pub use service::{Discovery, HealthReport, HeartbeatReceipt, Registry, Removal};
pub use sweep::{SweepCoordinator, SweepFailure, SweepReport};

#[cfg(test)]
pub(crate) mod test_support;
