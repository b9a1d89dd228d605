// Snapshot cache shared by the background refresher and HTTP readers.
//
// Two locks: the monitor mutex serializes passes (held across the whole computation),
// the snapshot mutex only guards swapping or cloning an Arc. Fresh reads never wait
// for a pass; a stale or empty cache makes the reader run one inline.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::models::Snapshot;
use crate::monitor::MonitorCore;

struct CachedSnapshot {
    snapshot: Arc<Snapshot>,
    captured_at: Instant,
}

pub struct SnapshotCache {
    monitor: tokio::sync::Mutex<MonitorCore>,
    current: Mutex<Option<CachedSnapshot>>,
    ttl: Duration,
}

impl SnapshotCache {
    pub fn new(monitor: MonitorCore, ttl: Duration) -> Self {
        Self {
            monitor: tokio::sync::Mutex::new(monitor),
            current: Mutex::new(None),
            ttl,
        }
    }

    /// Latest snapshot regardless of age, without triggering a pass.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.lock_current().as_ref().map(|c| c.snapshot.clone())
    }

    /// Age of the cached snapshot, `None` if nothing was captured yet.
    pub fn age(&self) -> Option<Duration> {
        self.lock_current()
            .as_ref()
            .map(|c| c.captured_at.elapsed())
    }

    /// Runs a pass and replaces the cached snapshot. Sole path the background worker uses.
    pub async fn refresh(&self) -> Arc<Snapshot> {
        let mut monitor = self.monitor.lock().await;
        let snapshot = Arc::new(monitor.get_all_stats().await);
        self.store(snapshot.clone());
        snapshot
    }

    /// Cached snapshot if younger than the TTL; otherwise computes one inline.
    pub async fn read(&self) -> Arc<Snapshot> {
        if let Some(snapshot) = self.fresh() {
            return snapshot;
        }
        let mut monitor = self.monitor.lock().await;
        // Another pass may have finished while we waited for the monitor.
        if let Some(snapshot) = self.fresh() {
            return snapshot;
        }
        debug!(operation = "read_snapshot", "cache stale; refreshing inline");
        let snapshot = Arc::new(monitor.get_all_stats().await);
        self.store(snapshot.clone());
        snapshot
    }

    fn fresh(&self) -> Option<Arc<Snapshot>> {
        self.lock_current()
            .as_ref()
            .filter(|c| c.captured_at.elapsed() <= self.ttl)
            .map(|c| c.snapshot.clone())
    }

    fn store(&self, snapshot: Arc<Snapshot>) {
        *self.lock_current() = Some(CachedSnapshot {
            snapshot,
            captured_at: Instant::now(),
        });
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, Option<CachedSnapshot>> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
