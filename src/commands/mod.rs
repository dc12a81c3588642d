//! Command Handlers
//!
//! Each command is a small struct implementing [`Command`]. Handlers capture
//! what they need at construction time (the shared store, configuration
//! values, the replication identity) and the [`Registry`] maps uppercased
//! command names to them.
//!
//! ```text
//! frame ["set", "k", "v"]
//!       │
//!       ▼
//! ┌─────────────┐  "SET"   ┌─────────────┐      ┌───────────────┐
//! │  Registry   │ ───────> │  Set        │ ───> │ StorageEngine │
//! │  dispatch() │          │  execute()  │      └───────────────┘
//! └─────────────┘          └─────────────┘
//!       │
//!       ▼
//!   RespValue
//! ```
//!
//! ## Supported Commands
//!
//! - `PING [message]`, `ECHO message`
//! - `GET key`, `SET key value [PX milliseconds]`, `KEYS *`
//! - `CONFIG GET <parameter|*>`, `INFO [section]`
//! - `REPLCONF ...`, `PSYNC replid offset`

pub mod keyspace;
pub mod registry;
pub mod replication;
pub mod server;

use crate::config::ServerConfig;
use crate::protocol::RespValue;
use crate::replication::ReplicationInfo;
use crate::storage::StorageEngine;
use bytes::Bytes;
use std::borrow::Cow;
use std::sync::Arc;

pub use keyspace::{Get, Keys, Set};
pub use registry::Registry;
pub use replication::{PSync, ReplConf};
pub use server::{ConfigGet, Echo, Info, Ping};

/// A command the server knows how to execute.
///
/// `args` excludes the command name itself.
pub trait Command: Send + Sync {
    /// Canonical command name, e.g. `"GET"`.
    fn name(&self) -> &'static str;

    fn execute(&self, args: &[Bytes]) -> RespValue;
}

/// Builds the registry with every supported command.
pub fn build_registry(
    storage: Arc<StorageEngine>,
    config: &ServerConfig,
    replication: Arc<ReplicationInfo>,
) -> Registry {
    let mut registry = Registry::new();

    registry.register(Ping);
    registry.register(Echo);
    registry.register(Get::new(Arc::clone(&storage)));
    registry.register(Set::new(Arc::clone(&storage)));
    registry.register(Keys::new(storage));
    registry.register(ConfigGet::new(config.exposed_params()));
    registry.register(Info::new(Arc::clone(&replication)));
    registry.register(ReplConf);
    registry.register(PSync::new(replication));

    registry
}

/// Lossy text view of an argument, for option keywords and names.
fn arg_text(arg: &Bytes) -> Cow<'_, str> {
    String::from_utf8_lossy(arg)
}
