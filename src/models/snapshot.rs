// Full monitor snapshot

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{Availability, ConnectionInfo, NetworkInfo, SpeedStats, TrafficStats};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const NEVER: &str = "Never";

/// Formats a local timestamp the way the API reports it (`2024-05-01 13:37:00`).
pub fn format_timestamp(ts: &DateTime<Local>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(s: &str) -> Option<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok()?;
    Local.from_local_datetime(&naive).earliest()
}

/// One complete monitoring pass. Never mutated after construction; the cache swaps whole values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(with = "timestamp_str")]
    pub timestamp: DateTime<Local>,
    pub availability: Availability,
    pub speed: SpeedStats,
    pub network_info: NetworkInfo,
    pub traffic: TrafficStats,
    pub processes: Vec<ConnectionInfo>,
    /// Onset of the ongoing outage; serialized as "Never" when connectivity is up.
    #[serde(with = "last_down_str")]
    pub last_down: Option<DateTime<Local>>,
}

mod timestamp_str {
    use super::*;

    pub fn serialize<S: Serializer>(ts: &DateTime<Local>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Local>, D::Error> {
        let raw = String::deserialize(d)?;
        parse_timestamp(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
    }
}

mod last_down_str {
    use super::*;

    pub fn serialize<S: Serializer>(ts: &Option<DateTime<Local>>, s: S) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => s.serialize_str(&format_timestamp(ts)),
            None => s.serialize_str(NEVER),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Local>>, D::Error> {
        let raw = String::deserialize(d)?;
        if raw == NEVER {
            return Ok(None);
        }
        parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid last_down: {}", raw)))
    }
}
