//! # FlintKV - An In-Memory Key-Value Server
//!
//! FlintKV speaks the Redis wire protocol (RESP), serves many clients
//! concurrently, and supports a small command set: PING/ECHO, GET/SET with
//! millisecond expiry, KEYS *, CONFIG GET, INFO, and the commands a replica
//! sends while bootstrapping (REPLCONF, PSYNC).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              FlintKV                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ server::run │    │  Handler    │    │  Registry   │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │                     ┌─────────────┐    ┌──────────────────────────┐     │
//! │                     │   RESP      │    │      StorageEngine       │     │
//! │                     │   Parser    │    │  RwLock<HashMap<K, V>>   │     │
//! │                     └─────────────┘    └──────────────────────────┘     │
//! │                                           ▲                  ▲          │
//! │                      ┌────────────────────┘                  │          │
//! │               ┌──────┴──────┐                  ┌─────────────┴───────┐  │
//! │               │  Snapshot   │                  │   ExpirySweeper     │  │
//! │               │ (startup)   │                  │ (opt-in, Tokio task)│  │
//! │               └─────────────┘                  └─────────────────────┘  │
//! │                                                                         │
//! │  Replica mode: handshake with the master before the listener binds.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use flintkv::commands::build_registry;
//! use flintkv::config::ServerConfig;
//! use flintkv::connection::ConnectionStats;
//! use flintkv::replication::ReplicationInfo;
//! use flintkv::storage::StorageEngine;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let config = ServerConfig::default();
//!     let storage = Arc::new(StorageEngine::new());
//!     let registry = build_registry(storage, &config, Arc::new(ReplicationInfo::master()));
//!
//!     let listener = TcpListener::bind(config.bind_address()).await?;
//!     flintkv::server::run(
//!         listener,
//!         Arc::new(registry),
//!         Arc::new(ConnectionStats::new()),
//!         tokio::signal::ctrl_c(),
//!     )
//!     .await
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP frame decoder and reply encoder
//! - [`storage`]: thread-safe store with per-key expiry
//! - [`commands`]: command handlers and the registry that dispatches to them
//! - [`connection`]: per-client read/dispatch/reply loop
//! - [`server`]: accept loop and shutdown
//! - [`replication`]: replication identity and the replica handshake
//! - [`snapshot`]: RDB decoding and startup loading
//! - [`config`]: command-line configuration
//!
//! ## Expiry
//!
//! Expiry is lazy: a read treats an expired key as absent but leaves it in
//! place, so `KEYS *` still lists it. With `--active-expiry` a background
//! task reclaims expired keys as well.

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod replication;
pub mod server;
pub mod snapshot;
pub mod storage;

pub use commands::{build_registry, Command, Registry};
pub use config::{ReplicaOf, ServerConfig};
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{ParseError, RespParser, RespValue};
pub use replication::ReplicationInfo;
pub use storage::{ExpiryConfig, ExpirySweeper, StorageEngine};

/// The default port FlintKV listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host FlintKV binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of FlintKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
