//! Key-value store capability.
//!
//! The registry keeps its state in an external store that offers only
//! single-key atomic operations and eventual read-after-write consistency.
//! Stores that also track per-key versions can advertise conditional writes,
//! which the ledger uses for optimistic concurrency.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::error::{BeaconError, Result};

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// A value read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
    /// Raw payload.
    pub bytes: Vec<u8>,
    /// Version token, present when the store supports conditional writes.
    pub version: Option<u64>,
}

impl StoredValue {
    /// Create an unversioned value.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            version: None,
        }
    }

    /// Create a versioned value.
    pub fn versioned(bytes: Vec<u8>, version: u64) -> Self {
        Self {
            bytes,
            version: Some(version),
        }
    }
}

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The write was applied.
    Applied,
    /// The key changed since it was read; nothing was written.
    Conflict,
}

/// The store operations the registry relies on.
///
/// `get`, `put`, `delete` and `list` are required. The conditional operations
/// are optional; a store that implements them must return `true` from
/// [`KvStore::supports_conditional_writes`].
pub trait KvStore: Send + Sync + 'static {
    /// Read a key.
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<StoredValue>>;

    /// Write a key unconditionally, expiring it after `ttl`.
    fn put<'a>(&'a self, key: &'a str, value: Vec<u8>, ttl: Duration) -> StoreFuture<'a, ()>;

    /// Delete a key. Deleting an absent key succeeds.
    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;

    /// List keys starting with `prefix`.
    fn list<'a>(&'a self, prefix: &'a str) -> StoreFuture<'a, Vec<String>>;

    /// Whether `put_if` and `delete_if` are available.
    fn supports_conditional_writes(&self) -> bool {
        false
    }

    /// Write a key only if its version still equals `expected`.
    ///
    /// `expected = None` means the key must be absent.
    fn put_if<'a>(
        &'a self,
        key: &'a str,
        value: Vec<u8>,
        ttl: Duration,
        expected: Option<u64>,
    ) -> StoreFuture<'a, CasOutcome> {
        let _ = (key, value, ttl, expected);
        Box::pin(async {
            Err(BeaconError::Unsupported(
                "store does not support conditional writes".to_string(),
            ))
        })
    }

    /// Delete a key only if its version still equals `expected`.
    fn delete_if<'a>(&'a self, key: &'a str, expected: u64) -> StoreFuture<'a, CasOutcome> {
        let _ = (key, expected);
        Box::pin(async {
            Err(BeaconError::Unsupported(
                "store does not support conditional deletes".to_string(),
            ))
        })
    }
}
