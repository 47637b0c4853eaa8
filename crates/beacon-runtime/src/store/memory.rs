use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use beacon_core::store::{CasOutcome, KvStore, StoreFuture, StoredValue};
use beacon_core::{Clock, SystemClock};

#[derive(Debug, Clone)]
struct Slot {
    bytes: Vec<u8>,
    version: u64,
    expires_at: DateTime<Utc>,
}

/// Process-local key-value store.
///
/// Keys expire once their TTL elapses on the store's clock. Every write bumps a
/// store-wide version counter, which backs the conditional operations when
/// they are enabled.
#[derive(Clone)]
pub struct MemoryStore {
    slots: Arc<RwLock<HashMap<String, Slot>>>,
    next_version: Arc<AtomicU64>,
    clock: Arc<dyn Clock>,
    conditional_writes: bool,
}

impl MemoryStore {
    /// Create a store on the wall clock with conditional writes enabled.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a store on the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
            next_version: Arc::new(AtomicU64::new(1)),
            clock,
            conditional_writes: true,
        }
    }

    /// Enable or disable the conditional operations.
    pub fn conditional_writes(mut self, enabled: bool) -> Self {
        self.conditional_writes = enabled;
        self
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.read_slots()
            .values()
            .filter(|slot| slot.expires_at > now)
            .count()
    }

    /// Whether the store holds no live keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_slots(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Slot>> {
        self.slots.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_slots(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Slot>> {
        self.slots.write().unwrap_or_else(|e| e.into_inner())
    }

    fn slot(&self, bytes: Vec<u8>, ttl: Duration) -> Slot {
        let now = self.clock.now();
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Slot {
            bytes,
            version: self.next_version.fetch_add(1, Ordering::SeqCst),
            expires_at,
        }
    }

    /// Current version of a live key.
    fn live_version(slots: &HashMap<String, Slot>, key: &str, now: DateTime<Utc>) -> Option<u64> {
        slots
            .get(key)
            .filter(|slot| slot.expires_at > now)
            .map(|slot| slot.version)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<StoredValue>> {
        Box::pin(async move {
            let now = self.clock.now();
            let mut slots = self.write_slots();

            let live = slots
                .get(key)
                .filter(|slot| slot.expires_at > now)
                .map(|slot| {
                    if self.conditional_writes {
                        StoredValue::versioned(slot.bytes.clone(), slot.version)
                    } else {
                        StoredValue::new(slot.bytes.clone())
                    }
                });

            if live.is_none() && slots.remove(key).is_some() {
                tracing::trace!(key, "Dropped key past its TTL");
            }

            Ok(live)
        })
    }

    fn put<'a>(&'a self, key: &'a str, value: Vec<u8>, ttl: Duration) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let slot = self.slot(value, ttl);
            self.write_slots().insert(key.to_string(), slot);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.write_slots().remove(key);
            Ok(())
        })
    }

    fn list<'a>(&'a self, prefix: &'a str) -> StoreFuture<'a, Vec<String>> {
        Box::pin(async move {
            let now = self.clock.now();
            let mut slots = self.write_slots();
            slots.retain(|_, slot| slot.expires_at > now);

            let mut keys: Vec<String> = slots
                .keys()
                .filter(|key| key.starts_with(prefix))
                .cloned()
                .collect();
            keys.sort();
            Ok(keys)
        })
    }

    fn supports_conditional_writes(&self) -> bool {
        self.conditional_writes
    }

    fn put_if<'a>(
        &'a self,
        key: &'a str,
        value: Vec<u8>,
        ttl: Duration,
        expected: Option<u64>,
    ) -> StoreFuture<'a, CasOutcome> {
        Box::pin(async move {
            if !self.conditional_writes {
                return Err(beacon_core::BeaconError::Unsupported(
                    "conditional writes are disabled on this store".to_string(),
                ));
            }

            let now = self.clock.now();
            let mut slots = self.write_slots();
            if Self::live_version(&slots, key, now) != expected {
                return Ok(CasOutcome::Conflict);
            }

            let slot = self.slot(value, ttl);
            slots.insert(key.to_string(), slot);
            Ok(CasOutcome::Applied)
        })
    }

    fn delete_if<'a>(&'a self, key: &'a str, expected: u64) -> StoreFuture<'a, CasOutcome> {
        Box::pin(async move {
            if !self.conditional_writes {
                return Err(beacon_core::BeaconError::Unsupported(
                    "conditional deletes are disabled on this store".to_string(),
                ));
            }

            let now = self.clock.now();
            let mut slots = self.write_slots();
            if Self::live_version(&slots, key, now) != Some(expected) {
                return Ok(CasOutcome::Conflict);
            }

            slots.remove(key);
            Ok(CasOutcome::Applied)
        })
    }
}
