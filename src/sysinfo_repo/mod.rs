// Host capabilities (counters, interfaces, connections) via sysinfo and /proc

mod linux;

use crate::probe::ProbeError;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Mutex;
use sysinfo::{Networks, Pid, ProcessesToUpdate, System};
use tracing::instrument;

/// Cumulative byte counters summed over all interfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

/// One interface as the host reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddrs {
    pub name: String,
    pub mac_address: Option<String>,
    pub ipv4: Vec<Ipv4Addr>,
}

/// One established TCP socket. `pid` is `None` when the owner is not visible to us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEntry {
    pub pid: Option<u32>,
    pub local: SocketAddr,
    pub remote: Option<SocketAddr>,
}

// The traits below are blocking; async callers go through spawn_blocking.

pub trait CounterSource: Send + Sync {
    fn read_counters(&self) -> Result<ByteCounters, ProbeError>;
}

pub trait InterfaceSource: Send + Sync {
    fn hostname(&self) -> Option<String>;
    fn interfaces(&self) -> Result<Vec<InterfaceAddrs>, ProbeError>;
}

pub trait ConnectionSource: Send + Sync {
    /// Established IPv4/IPv6 connections in enumeration order.
    fn established(&self) -> Result<Vec<SocketEntry>, ProbeError>;
    /// `None` when the process vanished or cannot be inspected.
    fn process_name(&self, pid: u32) -> Option<String>;
}

/// Runs a blocking capability call on the blocking pool.
pub async fn run_blocking<T, F>(f: F) -> Result<T, ProbeError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ProbeError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ProbeError::Capability(format!("blocking task join: {}", e)))?
}

pub struct SysinfoRepo {
    sys: Mutex<System>,
    networks: Mutex<Networks>,
}

impl Default for SysinfoRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoRepo {
    pub fn new() -> Self {
        Self {
            sys: Mutex::new(System::new()),
            networks: Mutex::new(Networks::new_with_refreshed_list()),
        }
    }

    fn with_networks<T>(&self, f: impl FnOnce(&mut Networks) -> T) -> Result<T, ProbeError> {
        let mut networks = self
            .networks
            .lock()
            .map_err(|e| ProbeError::Capability(format!("sysinfo networks lock poisoned: {}", e)))?;
        networks.refresh(true);
        Ok(f(&mut networks))
    }
}

impl CounterSource for SysinfoRepo {
    #[instrument(skip(self), fields(repo = "sysinfo", operation = "read_counters"))]
    fn read_counters(&self) -> Result<ByteCounters, ProbeError> {
        self.with_networks(|networks| {
            networks
                .list()
                .values()
                .fold(ByteCounters::default(), |acc, data| ByteCounters {
                    bytes_sent: acc.bytes_sent.saturating_add(data.total_transmitted()),
                    bytes_recv: acc.bytes_recv.saturating_add(data.total_received()),
                })
        })
    }
}

impl InterfaceSource for SysinfoRepo {
    fn hostname(&self) -> Option<String> {
        System::host_name().filter(|h| !h.is_empty())
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "interfaces"))]
    fn interfaces(&self) -> Result<Vec<InterfaceAddrs>, ProbeError> {
        self.with_networks(|networks| {
            networks
                .list()
                .iter()
                .map(|(name, data)| {
                    let mac = data.mac_address();
                    InterfaceAddrs {
                        name: name.clone(),
                        mac_address: (!mac.is_unspecified()).then(|| mac.to_string()),
                        ipv4: data
                            .ip_networks()
                            .iter()
                            .filter_map(|n| match n.addr {
                                std::net::IpAddr::V4(v4) => Some(v4),
                                std::net::IpAddr::V6(_) => None,
                            })
                            .collect(),
                    }
                })
                .collect()
        })
    }
}

impl ConnectionSource for SysinfoRepo {
    #[instrument(skip(self), fields(repo = "sysinfo", operation = "established"))]
    fn established(&self) -> Result<Vec<SocketEntry>, ProbeError> {
        let sockets = linux::established_sockets()?;
        // Names are looked up right after; refresh the process table once for the whole batch.
        let mut sys = self
            .sys
            .lock()
            .map_err(|e| ProbeError::Capability(format!("sysinfo lock poisoned: {}", e)))?;
        sys.refresh_processes(ProcessesToUpdate::All, true);
        Ok(sockets)
    }

    fn process_name(&self, pid: u32) -> Option<String> {
        let sys = self.sys.lock().ok()?;
        sys.process(Pid::from_u32(pid))
            .map(|p| p.name().to_string_lossy().into_owned())
    }
}
