use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness probe, returns server metadata and hub counters.
///
/// Answers 503 once the hub's control loop is gone.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let (status, mut body) = match state.hub.stats().await {
        Ok(stats) => (
            StatusCode::OK,
            json!({
                "status": "ok",
                "subscribers": stats.subscribers,
                "published": stats.published,
                "delivered": stats.delivered,
                "dropped": stats.dropped,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            json!({ "status": "hub_closed", "error": e.to_string() }),
        ),
    };

    body["version"] = json!(env!("CARGO_PKG_VERSION"));
    body["commit"] = json!(env!("DAGSTREAM_GIT_SHA"));
    body["started_at"] = json!(state.started_at.to_rfc3339());
    (status, Json(body))
}
