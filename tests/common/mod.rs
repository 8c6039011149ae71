//! Shared test utilities for Conduit integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use conduit::api::{create_router, AppState};
use conduit::config::ConduitConfig;
use conduit::registry::BackendCapabilities;
use conduit::service::{RecordOutcomeRequest, RouterService};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

/// Router service with default configuration.
pub fn make_service() -> Arc<RouterService> {
    make_service_with(ConduitConfig::default(), CancellationToken::new())
}

pub fn make_service_with(config: ConduitConfig, shutdown: CancellationToken) -> Arc<RouterService> {
    Arc::new(RouterService::new(&config, shutdown).unwrap())
}

/// Register each id with default (unknown) capabilities.
pub fn register_all(service: &RouterService, ids: &[&str]) {
    for id in ids {
        service
            .register_backend(id, BackendCapabilities::default())
            .unwrap();
    }
}

/// Report `count` outcomes for `backend` with a fixed duration.
pub fn report(
    service: &RouterService,
    backend: &str,
    success: bool,
    duration_ms: f64,
    content_type: &str,
    count: usize,
) {
    for _ in 0..count {
        let mut request = RecordOutcomeRequest::new(backend, success, duration_ms);
        request.content_type = content_type.to_string();
        request.content_size = 1024;
        service.record_outcome(request).unwrap();
    }
}

pub fn make_app(service: Arc<RouterService>) -> axum::Router {
    let state = Arc::new(AppState::new(service, Arc::new(ConduitConfig::default())));
    create_router(state)
}

/// Send one request and decode the JSON response body.
pub async fn send(
    app: &axum::Router,
    request: Request<Body>,
) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}
