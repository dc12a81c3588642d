//! Connection and server introspection commands: PING, ECHO, CONFIG, INFO.

use super::{arg_text, Command};
use crate::protocol::RespValue;
use crate::replication::ReplicationInfo;
use bytes::Bytes;
use std::sync::Arc;

/// PING [message]
#[derive(Debug, Clone, Copy, Default)]
pub struct Ping;

impl Command for Ping {
    fn name(&self) -> &'static str {
        "PING"
    }

    fn execute(&self, args: &[Bytes]) -> RespValue {
        match args {
            [] => RespValue::pong(),
            [message] => RespValue::bulk_string(message.clone()),
            _ => RespValue::wrong_arity(self.name()),
        }
    }
}

/// ECHO message
#[derive(Debug, Clone, Copy, Default)]
pub struct Echo;

impl Command for Echo {
    fn name(&self) -> &'static str {
        "ECHO"
    }

    fn execute(&self, args: &[Bytes]) -> RespValue {
        match args {
            [message] => RespValue::bulk_string(message.clone()),
            _ => RespValue::wrong_arity(self.name()),
        }
    }
}

/// CONFIG GET <parameter|*>
///
/// Only a fixed allow-list of parameters is visible.
#[derive(Debug, Clone)]
pub struct ConfigGet {
    params: Vec<(&'static str, String)>,
}

impl ConfigGet {
    pub fn new(params: Vec<(&'static str, String)>) -> Self {
        Self { params }
    }

    fn get(&self, pattern: &Bytes) -> RespValue {
        if pattern.as_ref() == b"*" {
            let values = self
                .params
                .iter()
                .flat_map(|(name, value)| {
                    [
                        RespValue::bulk_string(Bytes::from(*name)),
                        RespValue::bulk_string(Bytes::from(value.clone())),
                    ]
                })
                .collect();
            return RespValue::array(values);
        }

        let requested = arg_text(pattern);
        match self
            .params
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&requested))
        {
            Some((_, value)) => RespValue::array(vec![
                RespValue::bulk_string(pattern.clone()),
                RespValue::bulk_string(Bytes::from(value.clone())),
            ]),
            None => RespValue::array(vec![]),
        }
    }
}

impl Command for ConfigGet {
    fn name(&self) -> &'static str {
        "CONFIG"
    }

    fn execute(&self, args: &[Bytes]) -> RespValue {
        let Some((subcommand, rest)) = args.split_first() else {
            return RespValue::wrong_arity(self.name());
        };

        let subcommand = arg_text(subcommand);
        if !subcommand.eq_ignore_ascii_case("GET") {
            return RespValue::error(format!("ERR Unknown CONFIG subcommand: {}", subcommand));
        }

        match rest {
            [pattern] => self.get(pattern),
            _ => RespValue::wrong_arity("config get"),
        }
    }
}

/// INFO [section]
///
/// Only the replication section carries content.
#[derive(Debug, Clone)]
pub struct Info {
    replication: Arc<ReplicationInfo>,
}

impl Info {
    pub fn new(replication: Arc<ReplicationInfo>) -> Self {
        Self { replication }
    }
}

impl Command for Info {
    fn name(&self) -> &'static str {
        "INFO"
    }

    fn execute(&self, args: &[Bytes]) -> RespValue {
        let section = args
            .first()
            .map(|s| arg_text(s).to_lowercase())
            .unwrap_or_default();

        let body = if section.is_empty() || section == "replication" {
            self.replication.render()
        } else {
            format!("# {}\r\n", title_case(&section))
        };

        RespValue::bulk_string(Bytes::from(body))
    }
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
