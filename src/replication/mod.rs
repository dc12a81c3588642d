//! Replication Identity and Handshake
//!
//! A node is either a master or a replica of some other node. The identity
//! is fixed at startup and shared read-only with the INFO and PSYNC handlers.
//!
//! A replica performs a one-shot handshake (see [`handshake`]) before it
//! starts accepting clients. It does not consume the master's replication
//! stream afterwards.

pub mod handshake;

use crate::config::ReplicaOf;
use std::fmt;

pub use handshake::{connect_to_master, send_handshake, HandshakeError, HANDSHAKE_PAUSE};

/// Replication ID this node reports for itself.
pub const MASTER_REPLID: &str = "8371b4fb1155b71f4a04d3e1bc3e18c4a990aeeb";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Master,
    Replica,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Wire name expected by existing clients.
        match self {
            Role::Master => f.write_str("master"),
            Role::Replica => f.write_str("slave"),
        }
    }
}

/// This node's replication identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationInfo {
    pub role: Role,
    pub master_replid: String,
    pub master_repl_offset: u64,
    pub replica_of: Option<ReplicaOf>,
}

impl ReplicationInfo {
    /// Identity for a standalone master.
    pub fn master() -> Self {
        Self {
            role: Role::Master,
            master_replid: MASTER_REPLID.to_string(),
            master_repl_offset: 0,
            replica_of: None,
        }
    }

    /// Identity for a replica of `master`.
    pub fn replica(master: ReplicaOf) -> Self {
        Self {
            role: Role::Replica,
            replica_of: Some(master),
            ..Self::master()
        }
    }

    /// Master unless a master address is configured.
    pub fn from_replica_of(replica_of: Option<ReplicaOf>) -> Self {
        match replica_of {
            Some(master) => Self::replica(master),
            None => Self::master(),
        }
    }

    /// The `# Replication` section of INFO.
    pub fn render(&self) -> String {
        let mut info = String::from("# Replication\n");
        info.push_str(&format!("role:{}\n", self.role));
        info.push_str(&format!("master_replid:{}\n", self.master_replid));
        info.push_str(&format!("master_repl_offset:{}\n", self.master_repl_offset));

        if let Some(master) = &self.replica_of {
            info.push_str(&format!("master_host:{}\n", master.host));
            info.push_str(&format!("master_port:{}\n", master.port));
        }

        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_master_render() {
        let info = ReplicationInfo::master();
        assert_eq!(
            info.render(),
            "# Replication\n\
             role:master\n\
             master_replid:8371b4fb1155b71f4a04d3e1bc3e18c4a990aeeb\n\
             master_repl_offset:0\n"
        );
    }

    #[test]
    fn test_replica_render() {
        let info = ReplicationInfo::from_replica_of(Some(ReplicaOf {
            host: "localhost".to_string(),
            port: 6379,
        }));
        assert_eq!(info.role, Role::Replica);

        let rendered = info.render();
        assert!(rendered.starts_with("# Replication\nrole:slave\n"));
        assert!(rendered.ends_with("master_host:localhost\nmaster_port:6379\n"));
    }
}
