use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::expiry::ExpiryPolicy;
use crate::error::{BeaconError, Result};

/// A single address instance of a service and its last heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    /// Network address announced by the node.
    pub address: String,
    /// Last heartbeat time, stored as epoch milliseconds.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_heartbeat: DateTime<Utc>,
}

impl NodeRecord {
    /// Create a record with the given heartbeat time.
    pub fn new(address: impl Into<String>, last_heartbeat: DateTime<Utc>) -> Self {
        Self {
            address: address.into(),
            last_heartbeat,
        }
    }
}

/// What an upsert did to the node list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeartbeatOutcome {
    /// The address was not present and has been appended.
    Register,
    /// The address was present and its heartbeat was renewed.
    Heartbeat,
}

impl HeartbeatOutcome {
    /// Label used in responses and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Heartbeat => "heartbeat",
        }
    }
}

impl std::fmt::Display for HeartbeatOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The node list of one service, keyed by address.
///
/// Stored as a JSON array of [`NodeRecord`]. Order carries no meaning, but is
/// kept stable so that rewrites do not shuffle the persisted list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntry {
    service: String,
    nodes: Vec<NodeRecord>,
}

impl ServiceEntry {
    /// Create an empty entry for a service.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            nodes: Vec::new(),
        }
    }

    /// Build an entry from raw records, collapsing duplicate addresses.
    ///
    /// When an address appears more than once the latest heartbeat wins and the
    /// first position is kept.
    pub fn from_records(service: impl Into<String>, records: Vec<NodeRecord>) -> Self {
        let mut nodes: Vec<NodeRecord> = Vec::with_capacity(records.len());
        for record in records {
            match nodes.iter_mut().find(|n| n.address == record.address) {
                Some(existing) => {
                    if record.last_heartbeat > existing.last_heartbeat {
                        existing.last_heartbeat = record.last_heartbeat;
                    }
                }
                None => nodes.push(record),
            }
        }

        Self {
            service: service.into(),
            nodes,
        }
    }

    /// Decode a stored payload. `key` is only used for error reporting.
    pub fn decode(service: impl Into<String>, key: &str, bytes: &[u8]) -> Result<Self> {
        let records: Vec<NodeRecord> =
            serde_json::from_slice(bytes).map_err(|e| BeaconError::CorruptRecord {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self::from_records(service, records))
    }

    /// Encode the node list for storage.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.nodes)?)
    }

    /// Service name.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Current node list.
    pub fn nodes(&self) -> &[NodeRecord] {
        &self.nodes
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the entry has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node by address.
    pub fn find(&self, address: &str) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.address == address)
    }

    /// Renew an existing address or append a new one.
    ///
    /// A renewal never moves a heartbeat backwards.
    pub fn upsert(&mut self, address: &str, now: DateTime<Utc>) -> (HeartbeatOutcome, NodeRecord) {
        match self.nodes.iter_mut().find(|n| n.address == address) {
            Some(node) => {
                if now > node.last_heartbeat {
                    node.last_heartbeat = now;
                }
                (HeartbeatOutcome::Heartbeat, node.clone())
            }
            None => {
                let record = NodeRecord::new(address, now);
                self.nodes.push(record.clone());
                (HeartbeatOutcome::Register, record)
            }
        }
    }

    /// Remove an address, returning the removed record if it was present.
    pub fn remove(&mut self, address: &str) -> Option<NodeRecord> {
        let index = self.nodes.iter().position(|n| n.address == address)?;
        Some(self.nodes.remove(index))
    }

    /// Drop expired nodes, returning them.
    pub fn retain_active(&mut self, policy: &ExpiryPolicy, now: DateTime<Utc>) -> Vec<NodeRecord> {
        let (active, expired) = policy.partition(std::mem::take(&mut self.nodes), now);
        self.nodes = active;
        expired
    }
}
