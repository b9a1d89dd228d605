// GET handlers: version, api/stats, api/logs

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};

use super::AppState;
use crate::version::{NAME, VERSION};

/// GET /version: service name and version from Cargo.toml.
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/stats: cached snapshot; recomputed inline when stale.
pub(super) async fn stats_handler(State(state): State<AppState>) -> Response {
    let snapshot = state.cache.read().await;
    axum::Json(snapshot.as_ref()).into_response()
}

/// GET /api/logs: most recent event log lines. A missing or unreadable log is an empty list.
pub(super) async fn logs_handler(State(state): State<AppState>) -> impl IntoResponse {
    let logs = match state.event_log.recent(state.config.event_log.tail_lines) {
        Ok(lines) => lines,
        Err(e) => {
            tracing::warn!(
                error = %e,
                operation = "read_event_log",
                path = %state.event_log.path().display(),
                "event log unreadable"
            );
            Vec::new()
        }
    };
    axum::Json(serde_json::json!({ "logs": logs }))
}
