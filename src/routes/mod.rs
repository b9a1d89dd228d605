// HTTP routes consumed by the dashboard

mod http;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::cache::SnapshotCache;
use crate::config::AppConfig;
use crate::event_log::EventLog;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) cache: Arc<SnapshotCache>,
    pub(crate) event_log: Arc<EventLog>,
    pub(crate) config: AppConfig,
}

pub fn app(cache: Arc<SnapshotCache>, event_log: Arc<EventLog>, config: AppConfig) -> Router {
    let state = AppState {
        cache,
        event_log,
        config,
    };
    Router::new()
        .route("/", get(|| async { "netmon: network health monitor" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/stats", get(http::stats_handler)) // GET /api/stats
        .route("/api/logs", get(http::logs_handler)) // GET /api/logs
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
