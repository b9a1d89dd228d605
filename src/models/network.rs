// Host network, traffic and connection models

use serde::{Deserialize, Serialize};

use super::NOT_AVAILABLE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub hostname: String,
    pub local_ip: String,
    pub mac_address: String,
    pub interface_name: String,
    pub external_ip: String,
    pub provider: String,
}

impl NetworkInfo {
    /// Hostname only; every other field "N/A".
    pub fn unresolved(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            local_ip: NOT_AVAILABLE.into(),
            mac_address: NOT_AVAILABLE.into(),
            interface_name: NOT_AVAILABLE.into(),
            external_ip: NOT_AVAILABLE.into(),
            provider: NOT_AVAILABLE.into(),
        }
    }
}

/// Totals in megabytes, rates in kilobits per second over the nominal refresh interval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficStats {
    pub sent_total_mb: f64,
    pub recv_total_mb: f64,
    pub sent_rate_kbps: f64,
    pub recv_rate_kbps: f64,
}

/// One established connection and the process that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub pid: u32,
    pub name: String,
    pub local_address: String,
    pub remote_address: String,
    pub status: String,
}
