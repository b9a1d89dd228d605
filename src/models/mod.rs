// Domain models served by /api/stats

mod availability;
mod network;
mod snapshot;

pub use availability::{Availability, SpeedStats};
pub use network::{ConnectionInfo, NetworkInfo, TrafficStats};
pub use snapshot::{Snapshot, format_timestamp};

/// Placeholder for any field the host or a remote service could not provide.
pub const NOT_AVAILABLE: &str = "N/A";

/// Round to 2 decimals, the precision every rate and total is reported with.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
