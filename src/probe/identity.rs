// External IP and ISP lookup, done once at startup.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ProbeError;
use crate::config::IdentityConfig;
use crate::event_log::EventLog;
use crate::models::NOT_AVAILABLE;

/// External address and provider as seen by remote services; cached for the process lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostIdentity {
    pub external_ip: String,
    pub provider: String,
}

impl Default for HostIdentity {
    fn default() -> Self {
        Self {
            external_ip: NOT_AVAILABLE.into(),
            provider: NOT_AVAILABLE.into(),
        }
    }
}

impl HostIdentity {
    /// Best effort: resolves the external IP, then the ISP for that IP. Failures leave "N/A".
    pub async fn resolve(
        client: &reqwest::Client,
        config: &IdentityConfig,
        event_log: &EventLog,
    ) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        let mut identity = Self::default();

        match fetch_external_ip(client, &config.ip_url, timeout).await {
            Ok(Some(ip)) => identity.external_ip = ip,
            Ok(None) => return identity,
            Err(e) => {
                event_log.error(format!("External info update failed: {}", e));
                return identity;
            }
        }

        let isp_url = config.isp_url.replace("{ip}", &identity.external_ip);
        match fetch_provider(client, &isp_url, timeout).await {
            Ok(Some(provider)) => identity.provider = provider,
            Ok(None) => {}
            Err(e) => event_log.error(format!("External info update failed: {}", e)),
        }
        identity
    }
}

async fn get_with_timeout(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<reqwest::Response, ProbeError> {
    client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| ProbeError::from_reqwest(e, timeout))
}

async fn fetch_external_ip(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<Option<String>, ProbeError> {
    let body: serde_json::Value = get_with_timeout(client, url, timeout)
        .await?
        .json()
        .await
        .map_err(|e| ProbeError::Decode(e.to_string()))?;
    Ok(body.get("ip").and_then(|v| v.as_str()).map(str::to_string))
}

/// `isp`, else `org`. Only a 200 answer is consulted.
async fn fetch_provider(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<Option<String>, ProbeError> {
    let response = get_with_timeout(client, url, timeout).await?;
    if response.status() != reqwest::StatusCode::OK {
        warn!(
            status = response.status().as_u16(),
            operation = "isp_lookup",
            "ISP lookup returned non-200; provider left unknown"
        );
        return Ok(None);
    }
    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| ProbeError::Decode(e.to_string()))?;
    Ok(provider_from(&body))
}

fn provider_from(body: &serde_json::Value) -> Option<String> {
    ["isp", "org"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(|v| v.as_str()))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
