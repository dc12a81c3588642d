//! Opt-in Background Expiry Sweeper
//!
//! By default the store only evaluates expiry lazily, so an expired key that
//! is never read stays in memory (and in `KEYS` output). Starting the sweeper
//! (`--active-expiry`) adds periodic reclamation on top of that.
//!
//! The interval adapts: a sweep that reclaims a large share of the keyspace
//! halves the interval, a sweep that reclaims nothing doubles it, both within
//! `[min_interval, max_interval]`.

use crate::storage::StorageEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    /// Starting interval between sweeps
    pub base_interval: Duration,
    /// Floor for the adaptive interval
    pub min_interval: Duration,
    /// Cap for the adaptive interval
    pub max_interval: Duration,
    /// Fraction of keys reclaimed in one sweep above which the sweeper speeds up
    pub speedup_threshold: f64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(100),
            min_interval: Duration::from_millis(10),
            max_interval: Duration::from_secs(1),
            speedup_threshold: 0.25,
        }
    }
}

impl ExpiryConfig {
    fn next_interval(&self, current: Duration, keys_before: usize, reclaimed: usize) -> Duration {
        if keys_before == 0 {
            return current;
        }
        let rate = reclaimed as f64 / keys_before as f64;
        if rate > self.speedup_threshold {
            (current / 2).max(self.min_interval)
        } else if reclaimed == 0 {
            (current * 2).min(self.max_interval)
        } else {
            current
        }
    }
}

/// Handle to a running sweeper. Dropping it stops the task.
#[derive(Debug)]
pub struct ExpirySweeper {
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Spawns the sweeper on the current tokio runtime.
    pub fn start(engine: Arc<StorageEngine>, config: ExpiryConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(sweeper_loop(engine, config, shutdown_rx));
        info!("Background expiry sweeper started");
        Self { shutdown_tx }
    }

    /// Signals the task to stop. Also called on drop.
    pub fn stop(&self) {
        if !*self.shutdown_tx.borrow() {
            let _ = self.shutdown_tx.send(true);
            info!("Background expiry sweeper stopped");
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sweeper_loop(
    engine: Arc<StorageEngine>,
    config: ExpiryConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut interval = config.base_interval;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        let keys_before = engine.len();
        let reclaimed = engine.remove_expired();
        let next = config.next_interval(interval, keys_before, reclaimed);

        if reclaimed > 0 {
            debug!(
                reclaimed,
                keys_remaining = engine.len(),
                interval_ms = next.as_millis() as u64,
                "Expired keys reclaimed"
            );
        } else if next != interval {
            trace!(interval_ms = next.as_millis() as u64, "Sweeper backing off");
        }
        interval = next;
    }
}
