//! Server Configuration
//!
//! Parsed once at startup from the command line and read-only afterwards.

use clap::Parser;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::{DEFAULT_HOST, DEFAULT_PORT};

/// Parameter names `CONFIG GET` exposes, in `CONFIG GET *` order.
pub const EXPOSED_PARAMS: [&str; 3] = ["dir", "dbfilename", "port"];

/// Command-line configuration for the server.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "flintkv",
    version,
    about = "In-memory key-value server speaking the Redis wire protocol"
)]
pub struct ServerConfig {
    /// Directory holding the snapshot file
    #[arg(long, default_value = "/var/lib/redis")]
    pub dir: String,

    /// Snapshot file name inside --dir
    #[arg(long, default_value = "dump.rdb")]
    pub dbfilename: String,

    /// Port to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = DEFAULT_HOST)]
    pub bind: String,

    /// Run as a replica of "<host> <port>"
    #[arg(long)]
    pub replicaof: Option<ReplicaOf>,

    /// Periodically reclaim expired keys instead of only hiding them on read
    #[arg(long)]
    pub active_expiry: bool,

    /// Log filter directive, e.g. "info" or "flintkv=debug"
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            dir: "/var/lib/redis".to_string(),
            dbfilename: "dump.rdb".to_string(),
            port: DEFAULT_PORT,
            bind: DEFAULT_HOST.to_string(),
            replicaof: None,
            active_expiry: false,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Full path of the snapshot file.
    pub fn snapshot_path(&self) -> PathBuf {
        PathBuf::from(&self.dir).join(&self.dbfilename)
    }

    /// The bind address as `host:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// Value of one allow-listed parameter. Lookup is case-insensitive.
    pub fn param(&self, name: &str) -> Option<String> {
        match name.to_ascii_lowercase().as_str() {
            "dir" => Some(self.dir.clone()),
            "dbfilename" => Some(self.dbfilename.clone()),
            "port" => Some(self.port.to_string()),
            _ => None,
        }
    }

    /// Name/value pairs of every allow-listed parameter, in [`EXPOSED_PARAMS`] order.
    pub fn exposed_params(&self) -> Vec<(&'static str, String)> {
        EXPOSED_PARAMS
            .iter()
            .filter_map(|&name| self.param(name).map(|value| (name, value)))
            .collect()
    }
}

/// The master address a replica connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaOf {
    pub host: String,
    pub port: u16,
}

impl ReplicaOf {
    /// `host:port`, suitable for `TcpStream::connect`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ReplicaOf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.host, self.port)
    }
}

/// Errors raised while interpreting configuration values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("replica address must be \"<host> <port>\", got {0:?}")]
    MalformedReplicaOf(String),

    #[error("invalid master port {0:?}")]
    InvalidPort(String),
}

impl FromStr for ReplicaOf {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        let [host, port] = fields.as_slice() else {
            return Err(ConfigError::MalformedReplicaOf(s.to_string()));
        };

        let port = match port.parse::<u16>() {
            Ok(p) if p != 0 => p,
            _ => return Err(ConfigError::InvalidPort(port.to_string())),
        };

        Ok(ReplicaOf {
            host: host.to_string(),
            port,
        })
    }
}
