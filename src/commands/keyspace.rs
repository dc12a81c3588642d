//! Keyspace commands: GET, SET, KEYS.

use super::{arg_text, Command};
use crate::protocol::RespValue;
use crate::storage::StorageEngine;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

/// GET key
#[derive(Debug, Clone)]
pub struct Get {
    storage: Arc<StorageEngine>,
}

impl Get {
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }
}

impl Command for Get {
    fn name(&self) -> &'static str {
        "GET"
    }

    fn execute(&self, args: &[Bytes]) -> RespValue {
        let [key] = args else {
            return RespValue::wrong_arity(self.name());
        };

        match self.storage.get(key) {
            Some(value) => RespValue::bulk_string(value),
            None => RespValue::null(),
        }
    }
}

/// SET key value [PX milliseconds]
///
/// Always overwrites. Without PX any previous expiry is cleared.
#[derive(Debug, Clone)]
pub struct Set {
    storage: Arc<StorageEngine>,
}

impl Set {
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }
}

/// Parses the options after `key value`.
fn parse_set_options(options: &[Bytes]) -> Result<Option<Duration>, RespValue> {
    match options {
        [] => Ok(None),
        [flag, ms] if arg_text(flag).eq_ignore_ascii_case("PX") => {
            match arg_text(ms).parse::<u64>() {
                Ok(ms) if ms > 0 => Ok(Some(Duration::from_millis(ms))),
                _ => Err(RespValue::error(
                    "ERR invalid expire time in 'set' command",
                )),
            }
        }
        _ => Err(RespValue::error("ERR syntax error")),
    }
}

impl Command for Set {
    fn name(&self) -> &'static str {
        "SET"
    }

    fn execute(&self, args: &[Bytes]) -> RespValue {
        let [key, value, options @ ..] = args else {
            return RespValue::wrong_arity(self.name());
        };

        let ttl = match parse_set_options(options) {
            Ok(ttl) => ttl,
            Err(reply) => return reply,
        };

        match ttl {
            Some(ttl) => self.storage.set_with_ttl(key.clone(), value.clone(), ttl),
            None => self.storage.set(key.clone(), value.clone()),
        }

        RespValue::ok()
    }
}

/// KEYS *
///
/// Lists every key in the store, including ones whose expiry has passed but
/// that have not been removed yet.
#[derive(Debug, Clone)]
pub struct Keys {
    storage: Arc<StorageEngine>,
}

impl Keys {
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }
}

impl Command for Keys {
    fn name(&self) -> &'static str {
        "KEYS"
    }

    fn execute(&self, args: &[Bytes]) -> RespValue {
        let [pattern] = args else {
            return RespValue::wrong_arity(self.name());
        };
        if pattern.as_ref() != b"*" {
            return RespValue::error("ERR pattern not supported");
        }

        let keys = self
            .storage
            .keys()
            .into_iter()
            .map(RespValue::bulk_string)
            .collect();
        RespValue::array(keys)
    }
}
