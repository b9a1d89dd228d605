// Traffic accounting: totals and per-interval rates from cumulative byte counters.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::models::{TrafficStats, round2};
use crate::probe::ProbeError;
use crate::sysinfo_repo::{ByteCounters, CounterSource, run_blocking};

const BYTES_PER_MB: f64 = 1_048_576.0;

pub struct TrafficAccountant {
    source: Arc<dyn CounterSource>,
    baseline: ByteCounters,
    /// Nominal time between samples; rates assume `sample` is called at this cadence.
    interval_secs: f64,
}

impl TrafficAccountant {
    /// Primes the baseline from the current counters (zero if they cannot be read).
    pub async fn new(source: Arc<dyn CounterSource>, interval: Duration) -> Self {
        let reader = source.clone();
        let baseline = match run_blocking(move || reader.read_counters()).await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, operation = "prime_traffic_baseline", "traffic baseline unavailable");
                ByteCounters::default()
            }
        };
        Self::with_baseline(source, baseline, interval)
    }

    pub fn with_baseline(
        source: Arc<dyn CounterSource>,
        baseline: ByteCounters,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            baseline,
            interval_secs: interval.as_secs_f64(),
        }
    }

    pub fn baseline(&self) -> ByteCounters {
        self.baseline
    }

    /// Reads the counters and consumes one interval: the baseline moves to the new reading.
    pub async fn sample(&mut self) -> Result<TrafficStats, ProbeError> {
        let source = self.source.clone();
        let current = run_blocking(move || source.read_counters()).await?;
        Ok(self.advance(current))
    }

    fn advance(&mut self, current: ByteCounters) -> TrafficStats {
        // A counter that went backwards (interface reset) reads as no traffic.
        let sent = current.bytes_sent.saturating_sub(self.baseline.bytes_sent);
        let recv = current.bytes_recv.saturating_sub(self.baseline.bytes_recv);
        self.baseline = current;
        TrafficStats {
            sent_total_mb: round2(current.bytes_sent as f64 / BYTES_PER_MB),
            recv_total_mb: round2(current.bytes_recv as f64 / BYTES_PER_MB),
            sent_rate_kbps: rate_kbps(sent, self.interval_secs),
            recv_rate_kbps: rate_kbps(recv, self.interval_secs),
        }
    }
}

fn rate_kbps(delta_bytes: u64, interval_secs: f64) -> f64 {
    if interval_secs <= 0.0 {
        return 0.0;
    }
    round2(delta_bytes as f64 * 8.0 / 1024.0 / interval_secs)
}
