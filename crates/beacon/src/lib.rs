//! BEACON - a heartbeat-driven service registry
//!
//! Services announce their addresses and renew them with periodic heartbeats;
//! consumers discover the addresses that are still live. State lives in an
//! external key-value store with no transactions.

mod runtime;

pub use runtime::prelude;
pub use runtime::{init_logging, Beacon, BeaconBuilder};
