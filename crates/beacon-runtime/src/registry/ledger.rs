use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use beacon_core::config::{ConcurrencyMode, RegistryConfig};
use beacon_core::store::{CasOutcome, KvStore};
use beacon_core::{
    BeaconError, Clock, ExpiryPolicy, HeartbeatOutcome, NodeRecord, Result, ServiceEntry,
};

/// Ledger configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Liveness policy.
    pub expiry: ExpiryPolicy,
    /// TTL applied to every store write.
    pub store_ttl: Duration,
    /// Prefix prepended to service names to form keys.
    pub key_prefix: String,
    /// Requested write strategy.
    pub concurrency: ConcurrencyMode,
    /// Extra attempts after a conditional write conflict.
    pub max_conflict_retries: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::from(&RegistryConfig::default())
    }
}

impl From<&RegistryConfig> for LedgerConfig {
    fn from(config: &RegistryConfig) -> Self {
        Self {
            expiry: config.expiry_policy(),
            store_ttl: config.store_ttl(),
            key_prefix: config.key_prefix.clone(),
            concurrency: config.concurrency,
            max_conflict_retries: config.max_conflict_retries,
        }
    }
}

/// Result of an upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heartbeat {
    /// Whether the address was new or renewed.
    pub outcome: HeartbeatOutcome,
    /// The record as persisted.
    pub record: NodeRecord,
    /// When the record expires without another heartbeat.
    pub deadline: DateTime<Utc>,
}

/// Result of a removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removed {
    /// The record that was removed.
    pub record: NodeRecord,
    /// Nodes left for the service.
    pub remaining: usize,
}

/// Result of an expiry pass over one service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compaction {
    /// Nodes still live.
    pub active: Vec<NodeRecord>,
    /// Nodes dropped by this pass.
    pub expired: usize,
    /// Whether the key was deleted.
    pub deleted: bool,
}

/// Pending store mutation computed by a cycle step.
enum Write {
    Put(ServiceEntry),
    Delete,
    Skip,
}

/// Per-service node lists kept in a key-value store.
///
/// Every operation is one read-modify-write cycle on one key. In overwrite
/// mode the write is unconditional and concurrent writers race; in optimistic
/// mode the write is conditional on the version read and the cycle restarts
/// on conflict.
pub struct ServiceLedger {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
    mode: ConcurrencyMode,
}

impl ServiceLedger {
    /// Create a ledger, resolving the write strategy against the store.
    pub fn new(
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        config: LedgerConfig,
    ) -> Result<Self> {
        let conditional = store.supports_conditional_writes();
        if config.concurrency == ConcurrencyMode::Optimistic && !conditional {
            return Err(BeaconError::Config(
                "optimistic concurrency requires a store with conditional writes".to_string(),
            ));
        }

        let mode = config.concurrency.resolve(conditional);
        tracing::debug!(mode = mode.as_str(), "Service ledger initialised");

        Ok(Self {
            store,
            clock,
            config,
            mode,
        })
    }

    /// The resolved write strategy.
    pub fn mode(&self) -> ConcurrencyMode {
        self.mode
    }

    /// Ledger configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Backing store.
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Clock used for heartbeats and expiry.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Store key for a service.
    pub fn key_for(&self, service: &str) -> String {
        format!("{}{}", self.config.key_prefix, service)
    }

    /// Service name for a store key, if the key belongs to this ledger.
    pub fn service_for_key<'k>(&self, key: &'k str) -> Option<&'k str> {
        key.strip_prefix(self.config.key_prefix.as_str())
            .filter(|service| !service.is_empty())
    }

    /// Register a new address or renew an existing one.
    pub async fn upsert_heartbeat(&self, service: &str, address: &str) -> Result<Heartbeat> {
        let (outcome, record) = self
            .cycle(service, |entry, now| {
                let mut entry = entry.unwrap_or_else(|| ServiceEntry::new(service));
                let (outcome, record) = entry.upsert(address, now);
                Ok((Write::Put(entry), (outcome, record)))
            })
            .await?;

        match outcome {
            HeartbeatOutcome::Register => {
                tracing::info!(service, address, outcome = %outcome, "Node registered")
            }
            HeartbeatOutcome::Heartbeat => {
                tracing::debug!(service, address, outcome = %outcome, "Heartbeat renewed")
            }
        }

        let deadline = self.config.expiry.deadline(&record);
        Ok(Heartbeat {
            outcome,
            record,
            deadline,
        })
    }

    /// Remove an address.
    ///
    /// Fails with `ServiceNotFound` if the service has no entry and with
    /// `AddressNotFound` if the address is not listed. Removing the last
    /// address deletes the key.
    pub async fn remove_node(&self, service: &str, address: &str) -> Result<Removed> {
        let removed = self
            .cycle(service, |entry, _now| {
                let mut entry =
                    entry.ok_or_else(|| BeaconError::ServiceNotFound(service.to_string()))?;
                let record =
                    entry
                        .remove(address)
                        .ok_or_else(|| BeaconError::AddressNotFound {
                            service: service.to_string(),
                            address: address.to_string(),
                        })?;

                let remaining = entry.len();
                let write = if entry.is_empty() {
                    Write::Delete
                } else {
                    Write::Put(entry)
                };
                Ok((write, Removed { record, remaining }))
            })
            .await?;

        tracing::info!(
            service,
            address,
            remaining = removed.remaining,
            "Node unregistered"
        );
        Ok(removed)
    }

    /// Expire stale nodes and return the live ones.
    pub async fn list_active(&self, service: &str) -> Result<Vec<NodeRecord>> {
        Ok(self.expire_and_compact(service).await?.active)
    }

    /// Drop expired nodes, persisting the live subset or deleting the key.
    ///
    /// An absent key is left alone and yields an empty compaction.
    pub async fn expire_and_compact(&self, service: &str) -> Result<Compaction> {
        let expiry = self.config.expiry;
        let compaction = self
            .cycle(service, |entry, now| {
                let Some(mut entry) = entry else {
                    return Ok((Write::Skip, Compaction::default()));
                };

                let expired = entry.retain_active(&expiry, now).len();
                if entry.is_empty() {
                    Ok((
                        Write::Delete,
                        Compaction {
                            active: Vec::new(),
                            expired,
                            deleted: true,
                        },
                    ))
                } else {
                    let active = entry.nodes().to_vec();
                    Ok((
                        Write::Put(entry),
                        Compaction {
                            active,
                            expired,
                            deleted: false,
                        },
                    ))
                }
            })
            .await?;

        if compaction.deleted {
            tracing::info!(
                service,
                expired = compaction.expired,
                "Deleted service with no active nodes"
            );
        } else if compaction.expired > 0 {
            tracing::debug!(
                service,
                expired = compaction.expired,
                active = compaction.active.len(),
                "Expired stale nodes"
            );
        }

        Ok(compaction)
    }

    /// Run one read-modify-write cycle, retrying on conditional-write conflict.
    async fn cycle<T, F>(&self, service: &str, mut step: F) -> Result<T>
    where
        F: FnMut(Option<ServiceEntry>, DateTime<Utc>) -> Result<(Write, T)> + Send,
        T: Send,
    {
        let key = self.key_for(service);
        let attempts = match self.mode {
            ConcurrencyMode::Optimistic => self.config.max_conflict_retries.saturating_add(1),
            _ => 1,
        };

        for attempt in 1..=attempts {
            let current = self.store.get(&key).await?;
            let version = current.as_ref().and_then(|value| value.version);
            let existed = current.is_some();
            let entry = match current {
                Some(value) => Some(self.decode(service, &key, &value.bytes)?),
                None => None,
            };

            let now = self.clock.now();
            let (write, value) = step(entry, now)?;

            let applied = match self.mode {
                ConcurrencyMode::Optimistic => {
                    self.write_conditional(&key, write, existed, version)
                        .await?
                }
                _ => {
                    self.write_unconditional(&key, write).await?;
                    true
                }
            };

            if applied {
                return Ok(value);
            }

            tracing::debug!(key = %key, attempt, "Conditional write conflicted, retrying");
        }

        tracing::warn!(key = %key, attempts, "Giving up after repeated write conflicts");
        Err(BeaconError::Conflict { key, attempts })
    }

    fn decode(&self, service: &str, key: &str, bytes: &[u8]) -> Result<ServiceEntry> {
        ServiceEntry::decode(service, key, bytes).inspect_err(|e| {
            tracing::error!(key, error = %e, "Stored payload is corrupt; leaving key untouched");
        })
    }

    fn encode(&self, entry: &ServiceEntry) -> Result<Vec<u8>> {
        tracing::trace!(
            service = entry.service(),
            nodes = entry.len(),
            "Encoding service entry"
        );
        entry.encode()
    }

    async fn write_unconditional(&self, key: &str, write: Write) -> Result<()> {
        match write {
            Write::Put(entry) => {
                let bytes = self.encode(&entry)?;
                self.store.put(key, bytes, self.config.store_ttl).await
            }
            Write::Delete => self.store.delete(key).await,
            Write::Skip => Ok(()),
        }
    }

    async fn write_conditional(
        &self,
        key: &str,
        write: Write,
        existed: bool,
        version: Option<u64>,
    ) -> Result<bool> {
        if existed && version.is_none() {
            return Err(BeaconError::Unsupported(format!(
                "store returned an unversioned value for {}",
                key
            )));
        }

        let outcome = match write {
            Write::Put(entry) => {
                let bytes = self.encode(&entry)?;
                self.store
                    .put_if(key, bytes, self.config.store_ttl, version)
                    .await?
            }
            Write::Delete => match version {
                Some(version) => self.store.delete_if(key, version).await?,
                None => CasOutcome::Applied,
            },
            Write::Skip => CasOutcome::Applied,
        };

        Ok(outcome == CasOutcome::Applied)
    }
}
