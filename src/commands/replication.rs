//! Replication commands a master answers: REPLCONF and PSYNC.

use super::Command;
use crate::protocol::RespValue;
use crate::replication::ReplicationInfo;
use bytes::Bytes;
use std::sync::Arc;

/// REPLCONF <option> <value> ...
///
/// Options are accepted and ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplConf;

impl Command for ReplConf {
    fn name(&self) -> &'static str {
        "REPLCONF"
    }

    fn execute(&self, _args: &[Bytes]) -> RespValue {
        RespValue::ok()
    }
}

/// PSYNC replid offset
///
/// Always answers with a full resync from this node's own identity. No
/// snapshot payload follows.
#[derive(Debug, Clone)]
pub struct PSync {
    replication: Arc<ReplicationInfo>,
}

impl PSync {
    pub fn new(replication: Arc<ReplicationInfo>) -> Self {
        Self { replication }
    }
}

impl Command for PSync {
    fn name(&self) -> &'static str {
        "PSYNC"
    }

    fn execute(&self, args: &[Bytes]) -> RespValue {
        if args.len() < 2 {
            return RespValue::wrong_arity(self.name());
        }

        RespValue::simple_string(format!(
            "FULLRESYNC {} {}",
            self.replication.master_replid, self.replication.master_repl_offset
        ))
    }
}
