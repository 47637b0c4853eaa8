pub mod clock;
pub mod config;
pub mod error;
pub mod node;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::BeaconConfig;
pub use error::{BeaconError, ErrorKind, Result};
pub use node::{ExpiryPolicy, HeartbeatOutcome, NodeRecord, ServiceEntry};
pub use store::{CasOutcome, KvStore, StoreFuture, StoredValue};
