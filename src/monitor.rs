// Monitor core: one pass over every probe and collector, assembled into a Snapshot.
//
// Every sub-failure is logged to the event log and replaced by its fallback
// (null speed, "N/A" host fields, zero traffic, empty process list). A pass never fails.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tracing::{debug, instrument, warn};

use crate::census::ConnectionCensus;
use crate::downtime::DowntimeTracker;
use crate::event_log::EventLog;
use crate::host_info::HostInfoCollector;
use crate::models::{Snapshot, SpeedStats, TrafficStats};
use crate::probe::{ConnectivityCheck, SpeedTester};
use crate::traffic::TrafficAccountant;

/// Collaborators owned by the monitor.
pub struct MonitorDeps {
    pub connectivity: Arc<dyn ConnectivityCheck>,
    pub speed: Arc<dyn SpeedTester>,
    pub host_info: HostInfoCollector,
    pub traffic: TrafficAccountant,
    pub census: ConnectionCensus,
    pub event_log: Arc<EventLog>,
}

#[derive(Debug, Clone, Copy)]
pub struct MonitorTimings {
    pub probe_timeout: Duration,
    /// How long a pass waits for the speed test before aborting it.
    pub speed_deadline: Duration,
}

impl Default for MonitorTimings {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(5),
            speed_deadline: Duration::from_secs(8),
        }
    }
}

pub struct MonitorCore {
    connectivity: Arc<dyn ConnectivityCheck>,
    speed: Arc<dyn SpeedTester>,
    host_info: HostInfoCollector,
    traffic: TrafficAccountant,
    census: ConnectionCensus,
    downtime: DowntimeTracker,
    event_log: Arc<EventLog>,
    timings: MonitorTimings,
}

impl MonitorCore {
    pub fn new(deps: MonitorDeps, timings: MonitorTimings) -> Self {
        let MonitorDeps {
            connectivity,
            speed,
            host_info,
            traffic,
            census,
            event_log,
        } = deps;
        Self {
            connectivity,
            speed,
            host_info,
            traffic,
            census,
            downtime: DowntimeTracker::new(event_log.clone()),
            event_log,
            timings,
        }
    }

    pub fn event_log(&self) -> &Arc<EventLog> {
        &self.event_log
    }

    pub fn downtime(&self) -> &DowntimeTracker {
        &self.downtime
    }

    /// One monitoring pass. Consumes a traffic interval and may change downtime state.
    #[instrument(skip(self), fields(operation = "get_all_stats"))]
    pub async fn get_all_stats(&mut self) -> Snapshot {
        let availability = self.connectivity.check(self.timings.probe_timeout).await;

        let speed = if availability.available {
            self.measure_speed().await
        } else {
            SpeedStats::default()
        };

        let network_info = match self.host_info.collect().await {
            Ok(info) => info,
            Err(e) => {
                self.event_log.error(format!("Network info error: {}", e));
                self.host_info.fallback()
            }
        };
        let traffic = match self.traffic.sample().await {
            Ok(t) => t,
            Err(e) => {
                self.event_log.error(format!("Traffic counters error: {}", e));
                TrafficStats::default()
            }
        };
        let processes = match self.census.list().await {
            Ok(p) => p,
            Err(e) => {
                self.event_log.error(format!("Process scan error: {}", e));
                Vec::new()
            }
        };

        let now = Local::now();
        self.downtime.observe(availability.available, now);

        debug!(
            available = availability.available,
            status_code = availability.status_code,
            processes = processes.len(),
            "monitor pass complete"
        );

        Snapshot {
            timestamp: now,
            availability,
            speed,
            network_info,
            traffic,
            processes,
            last_down: self.downtime.last_down(),
        }
    }

    /// Runs the speed test as its own task, bounded by `speed_deadline`. An overrun is aborted.
    async fn measure_speed(&self) -> SpeedStats {
        let tester = self.speed.clone();
        let mut handle = tokio::spawn(async move { tester.measure().await });
        match tokio::time::timeout(self.timings.speed_deadline, &mut handle).await {
            Ok(Ok(Ok(stats))) => stats,
            Ok(Ok(Err(e))) => {
                self.event_log.error(format!("Speedtest failed: {}", e));
                SpeedStats::default()
            }
            Ok(Err(e)) => {
                self.event_log.error(format!("Speedtest failed: {}", e));
                SpeedStats::default()
            }
            Err(_) => {
                // Cancellation lands at the tester's next await point; its own timeout bounds the rest.
                handle.abort();
                warn!(
                    deadline_secs = self.timings.speed_deadline.as_secs(),
                    operation = "measure_speed",
                    "speed test exceeded deadline; result discarded"
                );
                SpeedStats::default()
            }
        }
    }
}
