//! Health check endpoint handler.

use super::{AppState, HealthResponse};
use axum::{extract::State, Json};
use std::sync::Arc;

/// GET /health - Return router status.
pub async fn handle(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let status = if state.service.is_shutting_down() {
        "shutting_down"
    } else {
        "ok"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        backends: state.service.registry().backend_count(),
        active_streams: state.service.active_streams(),
    })
}
