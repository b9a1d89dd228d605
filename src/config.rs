use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub probes: ProbesConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub speed: SpeedConfig,
    #[serde(default)]
    pub event_log: EventLogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Background refresh period; also the nominal interval traffic rates are computed over.
    pub refresh_interval_secs: u64,
    /// Readers older than this recompute the snapshot inline.
    pub cache_ttl_secs: u64,
    pub probe_timeout_secs: u64,
    /// How long a refresh waits for the speed test before dropping it.
    pub speed_deadline_secs: u64,
    pub max_processes: usize,
    /// How often the worker logs its counters at INFO.
    pub stats_log_interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 10,
            cache_ttl_secs: 5,
            probe_timeout_secs: 5,
            speed_deadline_secs: 8,
            max_processes: 20,
            stats_log_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbesConfig {
    /// Tried in order; the first endpoint that answers decides availability.
    pub urls: Vec<String>,
    pub user_agent: String,
}

impl Default for ProbesConfig {
    fn default() -> Self {
        Self {
            urls: vec![
                "https://www.google.com".into(),
                "https://www.cloudflare.com".into(),
                "https://1.1.1.1".into(),
            ],
            user_agent: "InternetMonitor/1.0".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Returns `{"ip": "..."}`.
    pub ip_url: String,
    /// `{ip}` is replaced with the resolved external address.
    pub isp_url: String,
    pub timeout_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            ip_url: "https://api.ipify.org?format=json".into(),
            isp_url: "http://ip-api.com/json/{ip}?fields=isp,org".into(),
            timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    /// Base URLs of speed-test servers; the lowest-latency one is used.
    pub servers: Vec<String>,
    /// Appended to a server base URL for the latency check.
    pub latency_path: String,
    /// Appended to a server base URL, `{bytes}` is replaced with `download_bytes`.
    pub download_path: String,
    pub upload_path: String,
    pub download_bytes: u64,
    pub upload_bytes: u64,
    pub request_timeout_secs: u64,
    /// Upper bound for one whole measurement, even after the monitor stopped waiting for it.
    pub internal_timeout_secs: u64,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            servers: vec!["https://speed.cloudflare.com".into()],
            latency_path: "/__down?bytes=0".into(),
            download_path: "/__down?bytes={bytes}".into(),
            upload_path: "/__up".into(),
            download_bytes: 5_000_000,
            upload_bytes: 1_000_000,
            request_timeout_secs: 8,
            internal_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventLogConfig {
    pub path: String,
    /// Lines returned by GET /api/logs.
    pub tail_lines: usize,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            path: "internet_events.log".into(),
            tail_lines: 50,
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            self.monitor.refresh_interval_secs > 0,
            "monitor.refresh_interval_secs must be > 0, got {}",
            self.monitor.refresh_interval_secs
        );
        anyhow::ensure!(
            self.monitor.probe_timeout_secs > 0,
            "monitor.probe_timeout_secs must be > 0, got {}",
            self.monitor.probe_timeout_secs
        );
        anyhow::ensure!(
            self.monitor.speed_deadline_secs > 0,
            "monitor.speed_deadline_secs must be > 0, got {}",
            self.monitor.speed_deadline_secs
        );
        anyhow::ensure!(
            self.monitor.max_processes > 0,
            "monitor.max_processes must be > 0, got {}",
            self.monitor.max_processes
        );
        anyhow::ensure!(
            self.monitor.stats_log_interval_secs > 0,
            "monitor.stats_log_interval_secs must be > 0, got {}",
            self.monitor.stats_log_interval_secs
        );
        anyhow::ensure!(
            !self.probes.urls.is_empty(),
            "probes.urls must list at least one endpoint"
        );
        anyhow::ensure!(
            self.identity.isp_url.contains("{ip}"),
            "identity.isp_url must contain an {{ip}} placeholder, got {}",
            self.identity.isp_url
        );
        anyhow::ensure!(
            !self.speed.servers.is_empty(),
            "speed.servers must list at least one server"
        );
        anyhow::ensure!(
            self.speed.internal_timeout_secs >= self.monitor.speed_deadline_secs,
            "speed.internal_timeout_secs ({}) must be >= monitor.speed_deadline_secs ({})",
            self.speed.internal_timeout_secs,
            self.monitor.speed_deadline_secs
        );
        anyhow::ensure!(
            !self.event_log.path.is_empty(),
            "event_log.path must be non-empty"
        );
        anyhow::ensure!(
            self.event_log.tail_lines > 0,
            "event_log.tail_lines must be > 0, got {}",
            self.event_log.tail_lines
        );
        Ok(())
    }
}
