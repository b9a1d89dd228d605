// HTTP throughput test: pick the lowest-latency server, then time a download and an upload.

use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use tracing::{debug, instrument};

use super::{ProbeError, SpeedTester};
use crate::config::SpeedConfig;
use crate::models::SpeedStats;

const BITS_PER_MEGABIT: f64 = 1_000_000.0;

pub struct HttpSpeedTester {
    client: reqwest::Client,
    config: SpeedConfig,
}

impl HttpSpeedTester {
    pub fn new(client: reqwest::Client, config: SpeedConfig) -> Self {
        Self { client, config }
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }

    /// Lowest-latency server among the configured ones.
    async fn best_server(&self) -> Result<&str, ProbeError> {
        let timeout = self.request_timeout();
        let mut best: Option<(&str, Duration)> = None;
        let mut last_error = None;
        for server in &self.config.servers {
            let url = format!("{}{}", server, self.config.latency_path);
            let start = Instant::now();
            let result = self
                .client
                .get(&url)
                .timeout(timeout)
                .send()
                .await
                .and_then(|r| r.error_for_status());
            match result {
                Ok(_) => {
                    let latency = start.elapsed();
                    debug!(server = %server, latency_ms = latency.as_millis() as u64, "speed server latency");
                    if best.is_none_or(|(_, l)| latency < l) {
                        best = Some((server.as_str(), latency));
                    }
                }
                Err(e) => last_error = Some(ProbeError::from_reqwest(e, timeout)),
            }
        }
        match best {
            Some((server, _)) => Ok(server),
            None => Err(last_error
                .unwrap_or_else(|| ProbeError::Network("no speed-test server configured".into()))),
        }
    }

    /// Download throughput in bits per second.
    async fn download(&self, server: &str) -> Result<f64, ProbeError> {
        let timeout = self.request_timeout();
        let path = self
            .config
            .download_path
            .replace("{bytes}", &self.config.download_bytes.to_string());
        let url = format!("{}{}", server, path);
        let start = Instant::now();
        let mut response = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ProbeError::from_reqwest(e, timeout))?;
        let mut received: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ProbeError::from_reqwest(e, timeout))?
        {
            received += chunk.len() as u64;
        }
        Ok(bits_per_second(received, start.elapsed()))
    }

    /// Upload throughput in bits per second.
    async fn upload(&self, server: &str) -> Result<f64, ProbeError> {
        let timeout = self.request_timeout();
        let url = format!("{}{}", server, self.config.upload_path);
        let payload = vec![0u8; self.config.upload_bytes as usize];
        let start = Instant::now();
        self.client
            .post(&url)
            .timeout(timeout)
            .body(payload)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ProbeError::from_reqwest(e, timeout))?;
        Ok(bits_per_second(self.config.upload_bytes, start.elapsed()))
    }

    #[instrument(skip(self), fields(probe = "speed", operation = "measure"))]
    async fn run(&self) -> Result<SpeedStats, ProbeError> {
        let server = self.best_server().await?;
        let download = self.download(server).await?;
        let upload = self.upload(server).await?;
        Ok(SpeedStats {
            download_mbps: Some(download / BITS_PER_MEGABIT),
            upload_mbps: Some(upload / BITS_PER_MEGABIT),
        })
    }
}

impl SpeedTester for HttpSpeedTester {
    fn measure(&self) -> BoxFuture<'_, Result<SpeedStats, ProbeError>> {
        let limit = Duration::from_secs(self.config.internal_timeout_secs);
        Box::pin(async move {
            tokio::time::timeout(limit, self.run())
                .await
                .unwrap_or_else(|_| Err(ProbeError::Timeout(limit)))
        })
    }
}

fn bits_per_second(bytes: u64, elapsed: Duration) -> f64 {
    (bytes as f64 * 8.0) / elapsed.as_secs_f64().max(f64::EPSILON)
}
