//! TCP accept loop.
//!
//! Accepts clients until the shutdown future resolves and spawns one
//! [`handle_connection`] task per client.

use crate::commands::Registry;
use crate::connection::{handle_connection, ConnectionStats};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

/// Longest backoff, in seconds, before a failing accept is given up on.
const MAX_ACCEPT_BACKOFF: u64 = 64;

struct Listener {
    listener: TcpListener,
    registry: Arc<Registry>,
    stats: Arc<ConnectionStats>,
}

impl Listener {
    async fn run(&self) -> io::Result<()> {
        loop {
            let (stream, addr) = self.accept().await?;

            let registry = Arc::clone(&self.registry);
            let stats = Arc::clone(&self.stats);
            tokio::spawn(handle_connection(stream, addr, registry, stats));
        }
    }

    /// Accepts one connection, retrying transient errors with exponential
    /// backoff (1s, 2s, 4s, ... up to 64s).
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        let mut backoff = 1;
        loop {
            match self.listener.accept().await {
                Ok(accepted) => return Ok(accepted),
                Err(err) => {
                    if backoff > MAX_ACCEPT_BACKOFF {
                        return Err(err);
                    }

                    warn!(error = %err, backoff_secs = backoff, "Accept failed, backing off");
                    tokio::time::sleep(Duration::from_secs(backoff)).await;

                    backoff *= 2;
                }
            }
        }
    }
}

/// Serves `listener` until `shutdown` completes or accepting keeps failing.
///
/// Connection tasks already running are not waited for.
pub async fn run(
    listener: TcpListener,
    registry: Arc<Registry>,
    stats: Arc<ConnectionStats>,
    shutdown: impl Future,
) -> io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, commands = registry.len(), "Accepting connections");
    }

    let server = Listener {
        listener,
        registry,
        stats: Arc::clone(&stats),
    };

    let result = tokio::select! {
        res = server.run() => {
            if let Err(err) = &res {
                error!(error = %err, "Giving up on accepting connections");
            }
            res
        }
        _ = shutdown => {
            info!("Shutdown signal received, stopping server...");
            Ok(())
        }
    };

    log_stats(&stats);
    result
}

fn log_stats(stats: &ConnectionStats) {
    info!(
        connections_accepted = stats.connections_accepted.load(Ordering::Relaxed),
        active_connections = stats.active_connections.load(Ordering::Relaxed),
        commands_processed = stats.commands_processed.load(Ordering::Relaxed),
        bytes_read = stats.bytes_read.load(Ordering::Relaxed),
        bytes_written = stats.bytes_written.load(Ordering::Relaxed),
        "Connection statistics"
    );
}
