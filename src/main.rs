use anyhow::Result;
use netmon::*;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let event_log = Arc::new(event_log::EventLog::open(&app_config.event_log.path)?);
    let client = probe::http_client(&app_config.probes.user_agent)?;

    let identity =
        probe::HostIdentity::resolve(&client, &app_config.identity, &event_log).await;
    tracing::info!(
        external_ip = %identity.external_ip,
        provider = %identity.provider,
        "host identity resolved"
    );

    let sysinfo_repo = Arc::new(sysinfo_repo::SysinfoRepo::new());
    let monitor_cfg = &app_config.monitor;
    let traffic = traffic::TrafficAccountant::new(
        sysinfo_repo.clone(),
        Duration::from_secs(monitor_cfg.refresh_interval_secs),
    )
    .await;

    let monitor = monitor::MonitorCore::new(
        monitor::MonitorDeps {
            connectivity: Arc::new(probe::ConnectivityProbe::new(
                client.clone(),
                app_config.probes.urls.clone(),
                event_log.clone(),
            )),
            speed: Arc::new(probe::HttpSpeedTester::new(
                client.clone(),
                app_config.speed.clone(),
            )),
            host_info: host_info::HostInfoCollector::new(sysinfo_repo.clone(), identity),
            traffic,
            census: census::ConnectionCensus::new(
                sysinfo_repo.clone(),
                monitor_cfg.max_processes,
            ),
            event_log: event_log.clone(),
        },
        monitor::MonitorTimings {
            probe_timeout: Duration::from_secs(monitor_cfg.probe_timeout_secs),
            speed_deadline: Duration::from_secs(monitor_cfg.speed_deadline_secs),
        },
    );
    let cache = Arc::new(cache::SnapshotCache::new(
        monitor,
        Duration::from_secs(monitor_cfg.cache_ttl_secs),
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let worker_handle = worker::spawn(
        worker::WorkerDeps {
            cache: cache.clone(),
            refreshes_total: Arc::new(AtomicU64::new(0)),
            shutdown_rx,
        },
        worker::WorkerConfig {
            refresh_interval_secs: monitor_cfg.refresh_interval_secs,
            stats_log_interval_secs: monitor_cfg.stats_log_interval_secs,
        },
    );

    let app = routes::app(cache, event_log, app_config.clone());
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            let _ = worker_handle.await;
        }
    }

    Ok(())
}
