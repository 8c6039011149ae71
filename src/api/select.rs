//! `POST /v1/select` - choose a backend for one unit of content.

use super::{ApiError, AppState};
use crate::service::{SelectBackendRequest, SelectBackendResponse};
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::Arc;

pub async fn handle(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SelectBackendRequest>, JsonRejection>,
) -> Result<Json<SelectBackendResponse>, ApiError> {
    let Json(request) = payload?;
    let response = state.service.select_backend(request)?;
    Ok(Json(response))
}
