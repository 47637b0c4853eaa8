use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use super::record::NodeRecord;

/// Default heartbeat expiry window.
pub const DEFAULT_EXPIRY_WINDOW: Duration = Duration::from_millis(300_000);

/// Decides whether a node is still live.
///
/// A node is expired once strictly more than `window` has elapsed since its
/// last heartbeat. Heartbeats in the future are treated as live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    window_ms: i64,
}

impl ExpiryPolicy {
    /// Create a policy with the given window.
    pub fn new(window: Duration) -> Self {
        Self {
            window_ms: i64::try_from(window.as_millis()).unwrap_or(i64::MAX),
        }
    }

    /// The configured window.
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms as u64)
    }

    /// Window in milliseconds.
    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    /// Check a record against `now`.
    pub fn is_expired(&self, record: &NodeRecord, now: DateTime<Utc>) -> bool {
        let elapsed = now
            .timestamp_millis()
            .saturating_sub(record.last_heartbeat.timestamp_millis());
        elapsed > self.window_ms
    }

    /// The instant after which a heartbeat at `from` is no longer live.
    pub fn deadline_from(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::try_milliseconds(self.window_ms)
            .and_then(|window| from.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Deadline of a record.
    pub fn deadline(&self, record: &NodeRecord) -> DateTime<Utc> {
        self.deadline_from(record.last_heartbeat)
    }

    /// Split records into `(active, expired)`, preserving order.
    pub fn partition(
        &self,
        records: Vec<NodeRecord>,
        now: DateTime<Utc>,
    ) -> (Vec<NodeRecord>, Vec<NodeRecord>) {
        records
            .into_iter()
            .partition(|record| !self.is_expired(record, now))
    }
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRY_WINDOW)
    }
}
