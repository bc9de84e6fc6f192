//! Thread-Safe Keyspace with Expiry Support
//!
//! This module implements the keyspace for SparkKV: a single map from key to
//! [`Entry`] guarded by one map-wide `RwLock`, with per-key absolute expiry.
//!
//! ## Design Decisions
//!
//! 1. **One Lock**: Every mutation takes the exclusive lock over the whole map,
//!    reads take the shared lock. There is no per-key or sharded locking.
//! 2. **Lazy Expiry**: A key whose expiry has passed is reported absent on every
//!    read, whether or not it has been physically removed yet.
//! 3. **Active Expiry**: [`StorageEngine::active_sweep`] removes a bounded sample
//!    of expired keys; the background sweeper calls it on a fixed interval.
//!    Keys with a TTL are also indexed by deadline, so a sweep reads only the
//!    front of that index instead of walking the map.
//! 4. **Wholesale Replacement**: Entries are never patched in place field by
//!    field; a write swaps in a complete new `Entry`.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                StorageEngine                │
//! │  ┌───────────────────────────────────────┐  │
//! │  │  RwLock<Keyspace>                     │  │
//! │  │   entries: HashMap<Bytes, Entry>      │  │
//! │  │   deadlines: BTreeSet<(u64, Bytes)>   │  │
//! │  │   get / exists        -> read lock    │  │
//! │  │   set / del / incr    -> write lock   │  │
//! │  │   sweep: read to sample, write per key│  │
//! │  └───────────────────────────────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::trace;

/// Default number of keys examined by one active sweep.
pub const DEFAULT_SAMPLE_SIZE: usize = 20;

/// Returns the current unix time in milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Represents a stored value with optional expiry time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The actual value stored
    pub value: Bytes,
    /// Absolute unix time in milliseconds at which the entry expires
    /// (None = never expires)
    pub expires_at: Option<u64>,
}

impl Entry {
    /// Creates a new entry without expiry.
    pub fn new(value: Bytes) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Creates a new entry that expires at the given unix millisecond.
    pub fn with_expiry(value: Bytes, expires_at: u64) -> Self {
        Self {
            value,
            expires_at: Some(expires_at),
        }
    }

    /// Checks if this entry has expired as of `now` (unix milliseconds).
    #[inline]
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }
}

/// Errors returned by keyspace operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The key is absent, its value does not parse as a signed 64-bit
    /// integer, or the result would overflow.
    #[error("value is not an integer or out of range")]
    NotAnInteger,
}

/// The map plus an index of expiry deadlines, kept in step under one lock.
#[derive(Default)]
struct Keyspace {
    entries: HashMap<Bytes, Entry>,
    /// `(expires_at, key)` for every entry that carries a TTL, oldest first
    deadlines: BTreeSet<(u64, Bytes)>,
}

impl Keyspace {
    fn insert(&mut self, key: Bytes, entry: Entry) {
        if let Some(at) = entry.expires_at {
            self.deadlines.insert((at, key.clone()));
        }
        if let Some(old) = self.entries.insert(key.clone(), entry) {
            self.forget_deadline(&key, &old);
        }
    }

    fn remove(&mut self, key: &[u8]) -> Option<Entry> {
        let (key, old) = self.entries.remove_entry(key)?;
        self.forget_deadline(&key, &old);
        Some(old)
    }

    fn forget_deadline(&mut self, key: &Bytes, old: &Entry) {
        if let Some(at) = old.expires_at {
            // A rewrite with the same deadline keeps its index slot
            let still_used = self
                .entries
                .get(key)
                .is_some_and(|current| current.expires_at == Some(at));
            if !still_used {
                self.deadlines.remove(&(at, key.clone()));
            }
        }
    }
}

/// The keyspace for SparkKV.
///
/// This struct is designed to be wrapped in an `Arc` and shared by every
/// connection task and the expiry sweeper. All operations are thread-safe.
///
/// # Example
///
/// ```
/// use sparkkv::storage::StorageEngine;
/// use bytes::Bytes;
///
/// let engine = StorageEngine::new();
///
/// engine.set(Bytes::from("name"), Bytes::from("blue"));
/// assert_eq!(engine.get(b"name"), Some(Bytes::from("blue")));
///
/// // Expires one minute from now
/// engine.set_with_relative_expiry(Bytes::from("session"), Bytes::from("abc123"), 60_000);
/// assert!(engine.exists(b"session"));
/// ```
pub struct StorageEngine {
    /// Every key in the database, behind the single keyspace lock
    data: RwLock<Keyspace>,

    /// Upper bound on keys removed by one active sweep
    sample_size: usize,

    /// Statistics: number of keys removed by active sweeps
    expired_count: AtomicU64,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("keys", &self.len())
            .field("sample_size", &self.sample_size)
            .field("expired_count", &self.expired_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates a new storage engine with the default sweep sample size.
    pub fn new() -> Self {
        Self::with_sample_size(DEFAULT_SAMPLE_SIZE)
    }

    /// Creates a new storage engine whose sweeps remove at most `sample_size` keys.
    pub fn with_sample_size(sample_size: usize) -> Self {
        Self {
            data: RwLock::new(Keyspace::default()),
            sample_size,
            expired_count: AtomicU64::new(0),
        }
    }

    /// Returns the sweep sample size.
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Sets a key-value pair without expiry.
    ///
    /// Any previous value and TTL are discarded.
    pub fn set(&self, key: Bytes, value: Bytes) {
        self.data.write().insert(key, Entry::new(value));
    }

    /// Sets a key-value pair that expires `ttl_ms` milliseconds from now.
    ///
    /// The caller validates that `ttl_ms` is positive.
    pub fn set_with_relative_expiry(&self, key: Bytes, value: Bytes, ttl_ms: u64) {
        let expires_at = now_ms().saturating_add(ttl_ms);
        self.data
            .write()
            .insert(key, Entry::with_expiry(value, expires_at));
    }

    /// Sets a key-value pair that expires at the unix millisecond `at_ms`.
    ///
    /// A timestamp in the past stores a key that is already logically absent.
    pub fn set_with_absolute_expiry(&self, key: Bytes, value: Bytes, at_ms: u64) {
        self.data.write().insert(key, Entry::with_expiry(value, at_ms));
    }

    /// Gets the value for a key.
    ///
    /// Returns `None` if the key doesn't exist or has expired. Only the shared
    /// lock is taken; expired entries are left for the sweeper to remove.
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.get_entry(key).map(|entry| entry.value)
    }

    /// Gets the full entry for a key (including its expiry).
    pub fn get_entry(&self, key: &[u8]) -> Option<Entry> {
        let now = now_ms();
        let data = self.data.read();
        data.entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .cloned()
    }

    /// Deletes a key from the database.
    ///
    /// # Returns
    ///
    /// Returns `true` if the key was deleted, `false` if it didn't exist.
    pub fn delete(&self, key: &[u8]) -> bool {
        self.data.write().remove(key).is_some()
    }

    /// Deletes multiple keys, returning how many were present.
    pub fn delete_many(&self, keys: &[Bytes]) -> u64 {
        keys.iter().filter(|key| self.delete(key)).count() as u64
    }

    /// Checks if a key exists (and is not expired).
    pub fn exists(&self, key: &[u8]) -> bool {
        let now = now_ms();
        let data = self.data.read();
        data.entries
            .get(key)
            .map(|e| !e.is_expired_at(now))
            .unwrap_or(false)
    }

    /// Counts how many of the given keys exist. Repeated keys count each time.
    pub fn exists_many(&self, keys: &[Bytes]) -> u64 {
        keys.iter().filter(|k| self.exists(k)).count() as u64
    }

    /// Increments an integer value by 1, keeping the key's expiry.
    pub fn incr(&self, key: &[u8]) -> Result<i64, StoreError> {
        self.add_to_integer(key, 1)
    }

    /// Decrements an integer value by 1, keeping the key's expiry.
    pub fn decr(&self, key: &[u8]) -> Result<i64, StoreError> {
        self.add_to_integer(key, -1)
    }

    /// Adds `delta` to the integer stored at `key`.
    ///
    /// Absent and expired keys are not created; they fail with
    /// [`StoreError::NotAnInteger`] like any non-numeric value.
    fn add_to_integer(&self, key: &[u8], delta: i64) -> Result<i64, StoreError> {
        let now = now_ms();
        let mut data = self.data.write();

        let entry = match data.entries.get_mut(key) {
            Some(entry) if !entry.is_expired_at(now) => entry,
            _ => return Err(StoreError::NotAnInteger),
        };

        let current: i64 = std::str::from_utf8(&entry.value)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(StoreError::NotAnInteger)?;

        let new_value = current
            .checked_add(delta)
            .ok_or(StoreError::NotAnInteger)?;

        // Same deadline, so the deadline index needs no update
        *entry = Entry {
            value: Bytes::from(new_value.to_string()),
            expires_at: entry.expires_at,
        };

        Ok(new_value)
    }

    /// Removes a bounded sample of expired keys.
    ///
    /// Up to `sample_size` keys whose deadline has passed are read off the
    /// front of the deadline index under the shared lock, so the work does
    /// not grow with the size of the keyspace. Live keys are never removed,
    /// even when they carry a TTL.
    ///
    /// # Returns
    ///
    /// Returns the number of keys removed, never more than
    /// `min(sample_size, keys with a TTL)`.
    pub fn active_sweep(&self) -> usize {
        let now = now_ms();
        let sample = self.sample_expired(now);
        let removed = self.evict_sampled(&sample, now);

        if removed > 0 {
            self.expired_count
                .fetch_add(removed as u64, Ordering::Relaxed);
        }
        trace!(sampled = sample.len(), removed, "Active sweep finished");

        removed
    }

    /// Keys whose deadline is at or before `now`, at most `sample_size` of them.
    fn sample_expired(&self, now: u64) -> Vec<Bytes> {
        let data = self.data.read();
        data.deadlines
            .iter()
            .take_while(|(at, _)| *at <= now)
            .take(self.sample_size)
            .map(|(_, key)| key.clone())
            .collect()
    }

    /// Removes each sampled key under its own exclusive lock, provided it is
    /// still expired: a key deleted or rewritten since sampling is left alone.
    fn evict_sampled(&self, sample: &[Bytes], now: u64) -> usize {
        let mut removed = 0;
        for key in sample {
            let mut data = self.data.write();
            let expired = data
                .entries
                .get(key)
                .is_some_and(|entry| entry.is_expired_at(now));
            if expired {
                data.remove(key);
                removed += 1;
            }
        }
        removed
    }

    /// Returns the number of stored keys, including expired keys that have
    /// not been swept yet.
    pub fn len(&self) -> usize {
        self.data.read().entries.len()
    }

    /// Returns true if the database holds no keys at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns database statistics.
    pub fn stats(&self) -> StorageStats {
        let data = self.data.read();
        StorageStats {
            keys: data.entries.len(),
            expires: data.deadlines.len(),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }
}

/// Database statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of keys currently stored
    pub keys: usize,
    /// Number of stored keys that carry a TTL
    pub expires: usize,
    /// Total keys removed by active sweeps
    pub expired: u64,
}
