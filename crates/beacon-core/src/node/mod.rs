mod expiry;
mod record;

pub use expiry::{ExpiryPolicy, DEFAULT_EXPIRY_WINDOW};
pub use record::{HeartbeatOutcome, NodeRecord, ServiceEntry};
