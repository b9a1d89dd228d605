// Connectivity probe: first endpoint that answers decides availability.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use tracing::debug;

use super::{ConnectivityCheck, is_dropped_connection};
use crate::event_log::EventLog;
use crate::models::{Availability, round2};

pub struct ConnectivityProbe {
    client: reqwest::Client,
    urls: Vec<String>,
    event_log: Arc<EventLog>,
}

impl ConnectivityProbe {
    pub fn new(client: reqwest::Client, urls: Vec<String>, event_log: Arc<EventLog>) -> Self {
        Self {
            client,
            urls,
            event_log,
        }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    async fn probe_all(&self, timeout: Duration) -> Availability {
        for url in &self.urls {
            let start = Instant::now();
            let response = match self.client.get(url).timeout(timeout).send().await {
                Ok(r) => r,
                Err(e) if e.is_connect() || e.is_timeout() || is_dropped_connection(&e) => {
                    debug!(error = %e, url = %url, operation = "connectivity_check", "endpoint unreachable");
                    continue;
                }
                Err(e) => {
                    self.event_log.error(format!("Request exception: {}", e));
                    continue;
                }
            };
            let ping_ms = round2(start.elapsed().as_secs_f64() * 1000.0);
            let status = response.status();
            // Any answer decides, error statuses included.
            if status.as_u16() >= 400 {
                self.event_log
                    .warning(format!("HTTP Error {} for {}", status.as_u16(), url));
            }
            return Availability {
                available: status.is_success() || status.is_redirection(),
                status_code: status.as_u16(),
                ping_ms: Some(ping_ms),
                probed_url: Some(url.clone()),
            };
        }
        Availability::unreachable()
    }
}

impl ConnectivityCheck for ConnectivityProbe {
    fn check(&self, timeout: Duration) -> BoxFuture<'_, Availability> {
        Box::pin(self.probe_all(timeout))
    }
}
