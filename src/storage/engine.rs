//! Expiring Key-Value Store
//!
//! A single `RwLock<HashMap>` shared by every connection task.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               StorageEngine                 │
//! │  ┌───────────────────────────────────────┐  │
//! │  │ RwLock<HashMap<Bytes, Entry>>         │  │
//! │  │   readers: get, keys   (shared)       │  │
//! │  │   writers: set, set_with_ttl, delete  │  │
//! │  │            remove_expired (exclusive) │  │
//! │  └───────────────────────────────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Expiry
//!
//! Expiry is evaluated lazily. `get` hides an entry whose deadline has
//! passed but leaves it in the map, and `keys` reports every key in the map
//! whether or not its deadline has passed. Memory for such entries is only
//! reclaimed by `delete`, an overwrite, or `remove_expired` (driven by the
//! opt-in sweeper in [`crate::storage::expiry`]).

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// A stored value with optional absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The stored value
    pub value: Bytes,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl Entry {
    /// Creates a new entry without expiry.
    pub fn new(value: Bytes) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Creates a new entry expiring `ttl` from now.
    pub fn with_ttl(value: Bytes, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Some(Instant::now() + ttl),
        }
    }

    /// An entry is expired once `now >= expires_at`.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }
}

/// The shared key-value store.
///
/// Wrap it in an `Arc` and hand a clone to every command handler that
/// needs it. All methods take `&self`.
///
/// # Example
///
/// ```
/// use flintkv::storage::StorageEngine;
/// use bytes::Bytes;
/// use std::time::Duration;
///
/// let engine = StorageEngine::new();
/// engine.set(Bytes::from("name"), Bytes::from("flint"));
/// assert_eq!(engine.get(b"name"), Some(Bytes::from("flint")));
///
/// engine.set_with_ttl(Bytes::from("session"), Bytes::from("abc"), Duration::from_secs(60));
/// assert_eq!(engine.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct StorageEngine {
    data: RwLock<HashMap<Bytes, Entry>>,
}

impl StorageEngine {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // Poisoning is ignored: every write is a single insert/remove/retain,
    // so the map is consistent even after a panicking holder.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Bytes, Entry>> {
        self.data.read().unwrap_or_else(|poison| poison.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Bytes, Entry>> {
        self.data.write().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Inserts or overwrites `key` with no expiry.
    ///
    /// Any expiry the previous entry carried is cleared.
    pub fn set(&self, key: Bytes, value: Bytes) {
        self.write().insert(key, Entry::new(value));
    }

    /// Inserts or overwrites `key`, expiring `ttl` from now.
    pub fn set_with_ttl(&self, key: Bytes, value: Bytes, ttl: Duration) {
        self.write().insert(key, Entry::with_ttl(value, ttl));
    }

    /// Returns the value for `key`, or `None` if it is absent or expired.
    ///
    /// An expired entry is left in place.
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        let data = self.read();
        let entry = data.get(key)?;
        if entry.is_expired() {
            return None;
        }
        Some(entry.value.clone())
    }

    /// Returns a clone of the raw entry, expired or not.
    pub fn get_entry(&self, key: &[u8]) -> Option<Entry> {
        self.read().get(key).cloned()
    }

    /// Returns every key in the map, including logically expired ones.
    /// Order is unspecified.
    pub fn keys(&self) -> Vec<Bytes> {
        self.read().keys().cloned().collect()
    }

    /// Removes `key` and returns whether it existed.
    pub fn delete(&self, key: &[u8]) -> bool {
        self.write().remove(key).is_some()
    }

    /// Removes every entry whose deadline has passed. Returns how many were removed.
    pub fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let mut data = self.write();
        let before = data.len();
        data.retain(|_, entry| !entry.is_expired_at(now));
        before - data.len()
    }

    /// Number of entries in the map, expired or not.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
