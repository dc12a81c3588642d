//! FlintKV server entry point.
//!
//! Loads the snapshot, performs the replica handshake when configured, then
//! serves clients until Ctrl+C.

use anyhow::Context;
use clap::Parser;
use flintkv::commands::build_registry;
use flintkv::config::ServerConfig;
use flintkv::connection::ConnectionStats;
use flintkv::replication::{connect_to_master, ReplicationInfo, HANDSHAKE_PAUSE};
use flintkv::snapshot;
use flintkv::storage::{ExpiryConfig, ExpirySweeper, StorageEngine};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level)
                .with_context(|| format!("invalid --log-level {:?}", config.log_level))?,
        )
        .with_target(false)
        .init();

    info!(version = flintkv::VERSION, "Starting FlintKV");

    // Shared across all connections
    let storage = Arc::new(StorageEngine::new());

    let snapshot_path = config.snapshot_path();
    snapshot::load_file(&snapshot_path, &storage)
        .with_context(|| format!("failed to load snapshot {}", snapshot_path.display()))?;

    let _sweeper = config
        .active_expiry
        .then(|| ExpirySweeper::start(Arc::clone(&storage), ExpiryConfig::default()));

    let replication = Arc::new(ReplicationInfo::from_replica_of(config.replicaof.clone()));

    // Held open for the life of the process; nothing reads from it.
    let _master_link = match &config.replicaof {
        Some(master) => Some(
            connect_to_master(master, config.port, HANDSHAKE_PAUSE)
                .await
                .context("replica handshake failed")?,
        ),
        None => None,
    };

    let registry = Arc::new(build_registry(
        Arc::clone(&storage),
        &config,
        Arc::clone(&replication),
    ));
    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!(address = %config.bind_address(), role = %replication.role, "Listening");

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    flintkv::server::run(listener, registry, stats, shutdown).await?;

    info!("Server shutdown complete");
    Ok(())
}
