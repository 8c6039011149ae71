//! # HTTP API
//!
//! JSON endpoints over the router service.
//!
//! ## Endpoints
//!
//! - `POST /v1/select` - Choose a backend for a unit of content
//! - `POST /v1/outcomes` - Record how an operation went
//! - `GET /v1/insights` - Learned weights, scores and statistics
//! - `GET /v1/metrics/stream` - Periodic metrics over a WebSocket
//! - `GET /v1/backends` - List registered backends
//! - `POST /v1/backends` - Register a backend
//! - `DELETE /v1/backends/:id` - Deregister a backend
//! - `GET /v1/stats` - JSON counters
//! - `GET /health` - Liveness and basic counts
//! - `GET /metrics` - Prometheus exposition
//!
//! ## Example
//!
//! ```no_run
//! use conduit::api::{create_router, AppState};
//! use conduit::config::ConduitConfig;
//! use conduit::service::RouterService;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(ConduitConfig::default());
//! let service = Arc::new(RouterService::new(&config, CancellationToken::new())?);
//!
//! let state = Arc::new(AppState::new(service, config));
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8070").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every failure uses the envelope in [`ApiError`], with the status code
//! derived from the error kind.

mod backends;
mod error;
mod health;
mod insights;
mod outcomes;
mod select;
pub mod stream;
pub mod types;

pub use error::{ApiError, ApiErrorBody};
pub use types::*;

use crate::config::ConduitConfig;
use crate::metrics::MetricsCollector;
use crate::service::RouterService;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub service: Arc<RouterService>,
    pub config: Arc<ConduitConfig>,
    /// Server startup time for uptime tracking
    pub start_time: Instant,
    pub metrics_collector: Arc<MetricsCollector>,
}

impl AppState {
    pub fn new(service: Arc<RouterService>, config: Arc<ConduitConfig>) -> Self {
        let start_time = Instant::now();
        let metrics_collector = Arc::new(MetricsCollector::new(
            Arc::clone(&service),
            start_time,
            crate::metrics::prometheus_handle(),
        ));

        Self {
            service,
            config,
            start_time,
            metrics_collector,
        }
    }
}

/// Create the main API router with all endpoints configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let max_body_bytes = state.config.server.max_body_bytes;

    Router::new()
        .route("/v1/select", post(select::handle))
        .route("/v1/outcomes", post(outcomes::handle))
        .route("/v1/insights", get(insights::handle))
        .route("/v1/metrics/stream", get(stream::handle))
        .route(
            "/v1/backends",
            get(backends::list).post(backends::register),
        )
        .route("/v1/backends/:id", delete(backends::deregister))
        .route("/v1/stats", get(crate::metrics::handler::stats_handler))
        .route("/health", get(health::handle))
        .route("/metrics", get(crate::metrics::handler::metrics_handler))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
