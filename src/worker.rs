// Background refresher: the only periodic writer into the snapshot cache.

use crate::cache::SnapshotCache;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::{Duration, interval};
use tracing::Instrument;

/// Cache and shutdown signal for the worker.
pub struct WorkerDeps {
    pub cache: Arc<SnapshotCache>,
    /// Incremented after every completed pass.
    pub refreshes_total: Arc<AtomicU64>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

/// Worker timing and logging config.
pub struct WorkerConfig {
    pub refresh_interval_secs: u64,
    /// How often to log worker stats at INFO (real seconds).
    pub stats_log_interval_secs: u64,
}

/// Spawns the refresher. The first pass runs immediately; later ones every `refresh_interval_secs`.
pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        cache,
        refreshes_total,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig {
        refresh_interval_secs,
        stats_log_interval_secs,
    } = config;

    let worker_span = tracing::span!(tracing::Level::DEBUG, "worker", refresh_interval_secs);
    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(refresh_interval_secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut stats_log_tick = interval(Duration::from_secs(stats_log_interval_secs));
        stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    // A pass can take tens of seconds; shutdown abandons it.
                    let snapshot = tokio::select! {
                        snapshot = cache.refresh() => snapshot,
                        _ = &mut shutdown_rx => {
                            tracing::debug!("Worker shutting down mid-refresh");
                            break;
                        }
                    };
                    refreshes_total.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(
                        operation = "refresh_snapshot",
                        available = snapshot.availability.available,
                        "Snapshot refreshed"
                    );
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Worker shutting down");
                    break;
                }
                _ = stats_log_tick.tick() => {
                    let latest = cache.latest();
                    tracing::info!(
                        refreshes_total = refreshes_total.load(Ordering::Relaxed),
                        available = latest.as_ref().map(|s| s.availability.available),
                        down_since = latest
                            .as_ref()
                            .and_then(|s| s.last_down)
                            .map(|t| crate::models::format_timestamp(&t)),
                        "monitor stats"
                    );
                }
            }
        }
    }
    .instrument(worker_span))
}
