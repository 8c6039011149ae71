//! Backend registration endpoints.

use super::{ApiError, AppState};
use crate::registry::Backend;
use crate::service::{BackendList, RegisterBackendRequest};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

/// GET /v1/backends
pub async fn list(State(state): State<Arc<AppState>>) -> Json<BackendList> {
    Json(BackendList {
        backends: state.service.list_backends(),
    })
}

/// POST /v1/backends
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterBackendRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Backend>), ApiError> {
    let Json(request) = payload?;
    let backend = state
        .service
        .register_backend(&request.backend_id, request.capabilities)?;
    Ok((StatusCode::CREATED, Json(backend)))
}

/// DELETE /v1/backends/:id
///
/// The backend's outcome history is kept.
pub async fn deregister(
    State(state): State<Arc<AppState>>,
    Path(backend_id): Path<String>,
) -> Result<Json<Backend>, ApiError> {
    let backend = state.service.deregister_backend(&backend_id)?;
    Ok(Json(backend))
}
