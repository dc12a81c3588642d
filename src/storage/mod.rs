//! Storage Module
//!
//! The expiring key-value store shared by every connection, plus an opt-in
//! background sweeper.
//!
//! ## Example
//!
//! ```
//! use flintkv::storage::StorageEngine;
//! use bytes::Bytes;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let engine = Arc::new(StorageEngine::new());
//! engine.set(Bytes::from("name"), Bytes::from("flint"));
//! assert_eq!(engine.get(b"name"), Some(Bytes::from("flint")));
//!
//! engine.set_with_ttl(
//!     Bytes::from("session"),
//!     Bytes::from("token123"),
//!     Duration::from_secs(3600),
//! );
//! assert_eq!(engine.keys().len(), 2);
//! ```

pub mod engine;
pub mod expiry;

pub use engine::{Entry, StorageEngine};
pub use expiry::{ExpiryConfig, ExpirySweeper};
