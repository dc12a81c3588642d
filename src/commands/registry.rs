//! Command name to handler lookup.

use super::Command;
use crate::protocol::RespValue;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Maps uppercased command names to handlers.
///
/// Built once at startup, then shared read-only by every connection.
#[derive(Default, Clone)]
pub struct Registry {
    handlers: HashMap<String, Arc<dyn Command>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Registry").field("commands", &names).finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under its uppercased name. A later registration
    /// of the same name replaces the earlier one.
    pub fn register<C: Command + 'static>(&mut self, handler: C) {
        self.handlers
            .insert(handler.name().to_uppercase(), Arc::new(handler));
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Command>> {
        self.handlers.get(&name.to_uppercase())
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Executes one frame. Element 0 is the command name.
    ///
    /// Returns `None` for an empty frame, which gets no reply.
    pub fn dispatch(&self, frame: &[Bytes]) -> Option<RespValue> {
        let (name, args) = frame.split_first()?;
        let name = String::from_utf8_lossy(name);

        let reply = match self.get(&name) {
            Some(handler) => {
                trace!(command = handler.name(), args = args.len(), "Dispatching");
                handler.execute(args)
            }
            None => RespValue::error(format!("ERR unknown command '{}'", name)),
        };

        Some(reply)
    }
}
