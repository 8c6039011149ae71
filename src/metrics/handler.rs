//! # Metrics HTTP Handlers
//!
//! Axum handlers for metrics endpoints.

use crate::api::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

/// Handler for GET /metrics endpoint (Prometheus text format).
///
/// Always returns 200 with the Prometheus content type, even before any
/// metric has been recorded.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.metrics_collector.update_gauges();

    let metrics = state.metrics_collector.render_metrics();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        metrics,
    )
}

/// Handler for GET /v1/stats endpoint (JSON format).
pub async fn stats_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.metrics_collector.update_gauges();
    Json(state.metrics_collector.stats())
}
