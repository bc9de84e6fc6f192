//! Storage Engine Module
//!
//! This module provides the keyspace for SparkKV: a thread-safe key-value map
//! with per-key expiry, plus the background sweeper that reclaims expired keys.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              StorageEngine              │
//! │   RwLock<Keyspace> + deadline index     │
//! │   Entry { value, expires_at (ms) }      │
//! └─────────────────────────────────────────┘
//!                     ▲
//!                     │ active_sweep() every 100ms
//!       ┌─────────────┴─────────────┐
//!       │     ExpirySweeper         │
//!       │  (Background Tokio Task)  │
//!       └───────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **RwLock**: Multiple concurrent readers, exclusive writers
//! - **TTL Support**: Relative (`EX`/`PX`) or absolute (`EXAT`/`PXAT`) expiry
//! - **Lazy Expiry**: Expired keys are invisible to every read
//! - **Active Expiry**: Background sweeper removes a bounded sample per tick
//!
//! ## Example
//!
//! ```
//! use sparkkv::storage::StorageEngine;
//! use bytes::Bytes;
//! use std::sync::Arc;
//!
//! let engine = Arc::new(StorageEngine::new());
//!
//! engine.set(Bytes::from("name"), Bytes::from("blue"));
//! assert_eq!(engine.get(b"name"), Some(Bytes::from("blue")));
//!
//! engine.set(Bytes::from("visits"), Bytes::from("41"));
//! assert_eq!(engine.incr(b"visits"), Ok(42));
//! ```

pub mod engine;
pub mod expiry;

// Re-export commonly used types
pub use engine::{now_ms, Entry, StorageEngine, StorageStats, StoreError, DEFAULT_SAMPLE_SIZE};
pub use expiry::{ExpiryConfig, ExpirySweeper, DEFAULT_SWEEP_INTERVAL, MIN_SWEEP_INTERVAL};
