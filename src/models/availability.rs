// Connectivity and throughput models

use serde::{Deserialize, Serialize};

/// Outcome of one connectivity check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Availability {
    pub available: bool,
    /// HTTP status of the deciding response; 0 when no endpoint answered.
    pub status_code: u16,
    pub ping_ms: Option<f64>,
    pub probed_url: Option<String>,
}

impl Availability {
    /// Result when every endpoint failed to answer.
    pub fn unreachable() -> Self {
        Self {
            available: false,
            status_code: 0,
            ping_ms: None,
            probed_url: None,
        }
    }
}

/// Throughput in megabits per second; both `None` when the test was skipped or failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeedStats {
    pub download_mbps: Option<f64>,
    pub upload_mbps: Option<f64>,
}
