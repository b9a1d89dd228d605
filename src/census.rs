// Connection census: established connections with their owning process names.

use std::sync::Arc;

use crate::models::{ConnectionInfo, NOT_AVAILABLE};
use crate::probe::ProbeError;
use crate::sysinfo_repo::{ConnectionSource, SocketEntry, run_blocking};

const STATUS_ESTABLISHED: &str = "ESTABLISHED";

pub struct ConnectionCensus {
    source: Arc<dyn ConnectionSource>,
    limit: usize,
}

impl ConnectionCensus {
    pub fn new(source: Arc<dyn ConnectionSource>, limit: usize) -> Self {
        Self { source, limit }
    }

    /// At most `limit` entries, in enumeration order. Vanished or inaccessible processes are skipped.
    pub async fn list(&self) -> Result<Vec<ConnectionInfo>, ProbeError> {
        let source = self.source.clone();
        let limit = self.limit;
        run_blocking(move || {
            let entries = source.established()?;
            Ok(resolve(source.as_ref(), entries, limit))
        })
        .await
    }
}

fn resolve(
    source: &dyn ConnectionSource,
    entries: Vec<SocketEntry>,
    limit: usize,
) -> Vec<ConnectionInfo> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let pid = entry.pid.filter(|&pid| pid != 0)?;
            let name = source.process_name(pid)?;
            Some(ConnectionInfo {
                pid,
                name,
                local_address: entry.local.to_string(),
                remote_address: entry
                    .remote
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| NOT_AVAILABLE.into()),
                status: STATUS_ESTABLISHED.into(),
            })
        })
        .take(limit)
        .collect()
}
