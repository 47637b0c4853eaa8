//! Fixtures shared by the registry tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use beacon_core::config::ConcurrencyMode;
use beacon_core::store::{CasOutcome, KvStore, StoreFuture, StoredValue};
use beacon_core::{BeaconError, Clock, ManualClock, ServiceEntry};

use super::ledger::{LedgerConfig, ServiceLedger};
use crate::store::MemoryStore;

/// Epoch milliseconds every fixture clock starts at.
pub(crate) const START_MS: i64 = 1_700_000_000_000;

pub(crate) struct Fixture {
    pub ledger: ServiceLedger,
    pub clock: ManualClock,
    pub store: MemoryStore,
}

/// Ledger over a memory store, both on one manual clock.
pub(crate) fn ledger(mode: ConcurrencyMode) -> Fixture {
    let clock = ManualClock::at_millis(START_MS);
    let store = MemoryStore::with_clock(Arc::new(clock.clone()));
    let config = LedgerConfig {
        concurrency: mode,
        ..LedgerConfig::default()
    };
    let ledger = ServiceLedger::new(Arc::new(store.clone()), Arc::new(clock.clone()), config)
        .expect("ledger");

    Fixture {
        ledger,
        clock,
        store,
    }
}

/// Ledger over an arbitrary store on a manual clock.
pub(crate) fn ledger_with<S: KvStore>(
    store: Arc<S>,
    mode: ConcurrencyMode,
) -> (ServiceLedger, ManualClock) {
    let clock = ManualClock::at_millis(START_MS);
    let config = LedgerConfig {
        concurrency: mode,
        ..LedgerConfig::default()
    };
    let ledger = ServiceLedger::new(store, Arc::new(clock.clone()), config).expect("ledger");
    (ledger, clock)
}

/// Ledger over a [`RacingStore`] that writes `address` on armed reads.
pub(crate) fn racing_ledger(
    config: LedgerConfig,
    conditional: bool,
    address: &str,
) -> (ServiceLedger, ManualClock, Arc<RacingStore>) {
    let clock = ManualClock::at_millis(START_MS);
    let inner = MemoryStore::with_clock(Arc::new(clock.clone())).conditional_writes(conditional);
    let racing = Arc::new(RacingStore::new(inner, clock.clone(), address));
    let ledger =
        ServiceLedger::new(racing.clone(), Arc::new(clock.clone()), config).expect("ledger");
    (ledger, clock, racing)
}

fn unavailable(op: &str, key: &str) -> BeaconError {
    BeaconError::StoreUnavailable(format!("injected {} failure for {}", op, key))
}

/// Store wrapper that fails selected operations.
pub(crate) struct FailingStore {
    inner: MemoryStore,
    fail_all_gets: AtomicBool,
    fail_lists: AtomicBool,
    failing_keys: Mutex<HashSet<String>>,
    get_calls: AtomicUsize,
}

impl FailingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_all_gets: AtomicBool::new(false),
            fail_lists: AtomicBool::new(false),
            failing_keys: Mutex::new(HashSet::new()),
            get_calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_all_gets.store(fail, Ordering::SeqCst);
    }

    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    pub fn fail_key(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn should_fail(&self, key: &str) -> bool {
        self.fail_all_gets.load(Ordering::SeqCst) || self.failing_keys.lock().unwrap().contains(key)
    }
}

impl KvStore for FailingStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<StoredValue>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail(key) {
            return Box::pin(async move { Err(unavailable("get", key)) });
        }
        self.inner.get(key)
    }

    fn put<'a>(&'a self, key: &'a str, value: Vec<u8>, ttl: Duration) -> StoreFuture<'a, ()> {
        self.inner.put(key, value, ttl)
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
        self.inner.delete(key)
    }

    fn list<'a>(&'a self, prefix: &'a str) -> StoreFuture<'a, Vec<String>> {
        if self.fail_lists.load(Ordering::SeqCst) {
            return Box::pin(async move { Err(unavailable("list", prefix)) });
        }
        self.inner.list(prefix)
    }

    fn supports_conditional_writes(&self) -> bool {
        self.inner.supports_conditional_writes()
    }

    fn put_if<'a>(
        &'a self,
        key: &'a str,
        value: Vec<u8>,
        ttl: Duration,
        expected: Option<u64>,
    ) -> StoreFuture<'a, CasOutcome> {
        self.inner.put_if(key, value, ttl, expected)
    }

    fn delete_if<'a>(&'a self, key: &'a str, expected: u64) -> StoreFuture<'a, CasOutcome> {
        self.inner.delete_if(key, expected)
    }
}

/// Store wrapper that lets a competing writer slip in between a read and the
/// write that follows it.
///
/// When armed, a `get` returns the current value and then writes `address`,
/// stamped with the current time, into the stored list behind the caller's
/// back, as another writer would.
pub(crate) struct RacingStore {
    inner: MemoryStore,
    clock: ManualClock,
    address: String,
    armed: AtomicBool,
    always: AtomicBool,
}

impl RacingStore {
    pub fn new(inner: MemoryStore, clock: ManualClock, address: &str) -> Self {
        Self {
            inner,
            clock,
            address: address.to_string(),
            armed: AtomicBool::new(false),
            always: AtomicBool::new(false),
        }
    }

    /// Interfere with the next read.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Interfere with every read from now on.
    pub fn arm_always(&self) {
        self.always.store(true, Ordering::SeqCst);
        self.arm();
    }

    async fn interfere(&self, key: &str, snapshot: Option<&StoredValue>) {
        let mut entry = snapshot
            .and_then(|value| ServiceEntry::decode(key, key, &value.bytes).ok())
            .unwrap_or_else(|| ServiceEntry::new(key));
        entry.upsert(&self.address, self.clock.now());

        let bytes = entry.encode().expect("encode");
        self.inner
            .put(key, bytes, Duration::from_secs(3600))
            .await
            .expect("competing write");
    }
}

impl KvStore for RacingStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<StoredValue>> {
        Box::pin(async move {
            let snapshot = self.inner.get(key).await?;
            let fire = if self.always.load(Ordering::SeqCst) {
                self.armed.load(Ordering::SeqCst)
            } else {
                self.armed.swap(false, Ordering::SeqCst)
            };
            if fire {
                self.interfere(key, snapshot.as_ref()).await;
            }
            Ok(snapshot)
        })
    }

    fn put<'a>(&'a self, key: &'a str, value: Vec<u8>, ttl: Duration) -> StoreFuture<'a, ()> {
        self.inner.put(key, value, ttl)
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
        self.inner.delete(key)
    }

    fn list<'a>(&'a self, prefix: &'a str) -> StoreFuture<'a, Vec<String>> {
        self.inner.list(prefix)
    }

    fn supports_conditional_writes(&self) -> bool {
        self.inner.supports_conditional_writes()
    }

    fn put_if<'a>(
        &'a self,
        key: &'a str,
        value: Vec<u8>,
        ttl: Duration,
        expected: Option<u64>,
    ) -> StoreFuture<'a, CasOutcome> {
        self.inner.put_if(key, value, ttl, expected)
    }

    fn delete_if<'a>(&'a self, key: &'a str, expected: u64) -> StoreFuture<'a, CasOutcome> {
        self.inner.delete_if(key, expected)
    }
}
