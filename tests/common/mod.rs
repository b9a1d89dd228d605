// Shared test helpers: fake host capabilities, fake probes, local HTTP services

#![allow(dead_code)]

use futures_util::future::BoxFuture;
use netmon::census::ConnectionCensus;
use netmon::event_log::EventLog;
use netmon::host_info::HostInfoCollector;
use netmon::models::{Availability, SpeedStats};
use netmon::monitor::{MonitorCore, MonitorDeps, MonitorTimings};
use netmon::probe::{ConnectivityCheck, HostIdentity, ProbeError, SpeedTester};
use netmon::sysinfo_repo::{
    ByteCounters, ConnectionSource, CounterSource, InterfaceAddrs, InterfaceSource, SocketEntry,
};
use netmon::traffic::TrafficAccountant;
use std::collections::{HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// --- Probes ---

/// Availability from a script of up/down results, then `fallback` forever.
/// Pass `n` (0-based) reports status 200 + n when up.
pub struct FakeConnectivity {
    script: Mutex<VecDeque<bool>>,
    fallback: bool,
    delay: Duration,
    pub calls: AtomicUsize,
}

impl FakeConnectivity {
    pub fn up() -> Self {
        Self::scripted(&[], true)
    }

    pub fn down() -> Self {
        Self::scripted(&[], false)
    }

    pub fn scripted(script: &[bool], fallback: bool) -> Self {
        Self {
            script: Mutex::new(script.iter().copied().collect()),
            fallback,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl ConnectivityCheck for FakeConnectivity {
    fn check(&self, _timeout: Duration) -> BoxFuture<'_, Availability> {
        Box::pin(async move {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let available = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(self.fallback);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if available {
                Availability {
                    available: true,
                    status_code: 200 + (n % 100) as u16,
                    ping_ms: Some(12.5),
                    probed_url: Some("https://probe.test".into()),
                }
            } else {
                Availability::unreachable()
            }
        })
    }
}

/// Speed test that sleeps `delay`, then returns `result` (or a network error when `None`).
pub struct FakeSpeed {
    delay: Duration,
    result: Option<SpeedStats>,
    pub calls: AtomicUsize,
    /// Set when a measurement ran to completion.
    pub finished: Arc<AtomicBool>,
    /// Set when a measurement future was dropped, completed or not.
    pub dropped: Arc<AtomicBool>,
}

impl FakeSpeed {
    pub fn returning(download: f64, upload: f64) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Some(SpeedStats {
                download_mbps: Some(download),
                upload_mbps: Some(upload),
            }),
            calls: AtomicUsize::new(0),
            finished: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: None,
            ..Self::returning(0.0, 0.0)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl SpeedTester for FakeSpeed {
    fn measure(&self) -> BoxFuture<'_, Result<SpeedStats, ProbeError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _flag = DropFlag(self.dropped.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.finished.store(true, Ordering::SeqCst);
            self.result
                .clone()
                .ok_or_else(|| ProbeError::Network("speed server unreachable".into()))
        })
    }
}

// --- Host capabilities ---

#[derive(Default)]
pub struct FakeCounters {
    sent: AtomicU64,
    recv: AtomicU64,
    pub fail: AtomicBool,
}

impl FakeCounters {
    pub fn starting_at(sent: u64, recv: u64) -> Self {
        Self {
            sent: AtomicU64::new(sent),
            recv: AtomicU64::new(recv),
            fail: AtomicBool::new(false),
        }
    }

    pub fn add(&self, sent: u64, recv: u64) {
        self.sent.fetch_add(sent, Ordering::SeqCst);
        self.recv.fetch_add(recv, Ordering::SeqCst);
    }

    pub fn current(&self) -> ByteCounters {
        ByteCounters {
            bytes_sent: self.sent.load(Ordering::SeqCst),
            bytes_recv: self.recv.load(Ordering::SeqCst),
        }
    }
}

impl CounterSource for FakeCounters {
    fn read_counters(&self) -> Result<ByteCounters, ProbeError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProbeError::Capability("counters unavailable".into()));
        }
        Ok(self.current())
    }
}

pub struct FakeInterfaces {
    pub hostname: Option<String>,
    pub interfaces: Vec<InterfaceAddrs>,
    pub fail: bool,
}

impl FakeInterfaces {
    pub fn with(interfaces: Vec<InterfaceAddrs>) -> Self {
        Self {
            hostname: Some("testhost".into()),
            interfaces,
            fail: false,
        }
    }

    pub fn typical() -> Self {
        Self::with(vec![
            iface("lo", &["127.0.0.1"], None),
            iface("eth0", &["10.0.0.5"], Some("11:22:33:44:55:66")),
        ])
    }
}

pub fn iface(name: &str, ipv4: &[&str], mac: Option<&str>) -> InterfaceAddrs {
    InterfaceAddrs {
        name: name.into(),
        mac_address: mac.map(str::to_string),
        ipv4: ipv4.iter().map(|s| s.parse().unwrap()).collect(),
    }
}

impl InterfaceSource for FakeInterfaces {
    fn hostname(&self) -> Option<String> {
        self.hostname.clone()
    }

    fn interfaces(&self) -> Result<Vec<InterfaceAddrs>, ProbeError> {
        if self.fail {
            return Err(ProbeError::Capability("interfaces unavailable".into()));
        }
        Ok(self.interfaces.clone())
    }
}

/// `count` established connections owned by pids 1000.., or one more per call when `grow`.
pub struct FakeConnections {
    count: usize,
    grow: bool,
    pub vanished: HashSet<u32>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeConnections {
    pub fn fixed(count: usize) -> Self {
        Self {
            count,
            grow: false,
            vanished: HashSet::new(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Pass `n` (0-based) sees `n` connections.
    pub fn growing() -> Self {
        Self {
            grow: true,
            ..Self::fixed(0)
        }
    }
}

impl ConnectionSource for FakeConnections {
    fn established(&self) -> Result<Vec<SocketEntry>, ProbeError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProbeError::Capability("permission denied".into()));
        }
        let count = if self.grow { n } else { self.count };
        Ok((0..count)
            .map(|i| SocketEntry {
                pid: Some(1000 + i as u32),
                local: SocketAddr::from(([127, 0, 0, 1], 40_000 + i as u16)),
                remote: Some(SocketAddr::from(([93, 184, 216, 34], 443))),
            })
            .collect())
    }

    fn process_name(&self, pid: u32) -> Option<String> {
        if self.vanished.contains(&pid) {
            None
        } else {
            Some(format!("proc-{}", pid))
        }
    }
}

// --- Monitor assembly ---

pub struct Harness {
    pub dir: tempfile::TempDir,
    pub event_log: Arc<EventLog>,
    pub connectivity: Arc<FakeConnectivity>,
    pub speed: Arc<FakeSpeed>,
    pub counters: Arc<FakeCounters>,
    pub interfaces: Arc<FakeInterfaces>,
    pub connections: Arc<FakeConnections>,
    pub identity: HostIdentity,
    pub max_processes: usize,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::TempDir::new().unwrap();
        let event_log = Arc::new(EventLog::open(dir.path().join("internet_events.log")).unwrap());
        Self {
            dir,
            event_log,
            connectivity: Arc::new(FakeConnectivity::up()),
            speed: Arc::new(FakeSpeed::returning(95.5, 20.25)),
            counters: Arc::new(FakeCounters::starting_at(1_048_576, 2_097_152)),
            interfaces: Arc::new(FakeInterfaces::typical()),
            connections: Arc::new(FakeConnections::fixed(3)),
            identity: HostIdentity {
                external_ip: "203.0.113.7".into(),
                provider: "Example ISP".into(),
            },
            max_processes: 20,
        }
    }

    pub fn monitor(&self) -> MonitorCore {
        self.monitor_with(MonitorTimings::default())
    }

    pub fn monitor_with(&self, timings: MonitorTimings) -> MonitorCore {
        MonitorCore::new(
            MonitorDeps {
                connectivity: self.connectivity.clone(),
                speed: self.speed.clone(),
                host_info: HostInfoCollector::new(self.interfaces.clone(), self.identity.clone()),
                traffic: TrafficAccountant::with_baseline(
                    self.counters.clone(),
                    self.counters.current(),
                    Duration::from_secs(10),
                ),
                census: ConnectionCensus::new(self.connections.clone(), self.max_processes),
                event_log: self.event_log.clone(),
            },
            timings,
        )
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.event_log.recent(1000).unwrap()
    }
}

// --- Local HTTP services ---

/// Serves `router` on an ephemeral localhost port.
pub async fn serve(router: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// Accepts connections and never answers, so every request times out.
pub async fn black_hole() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// Accepts connections and closes them at once, before any response.
pub async fn hang_up() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            drop(socket);
        }
    });
    addr
}

/// A localhost address nothing listens on (connection refused).
pub async fn closed_port() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .user_agent("InternetMonitor/1.0")
        .build()
        .unwrap()
}
