//! `POST /v1/outcomes` - report how an operation on a backend went.

use super::{ApiError, AppState};
use crate::service::{RecordOutcomeRequest, RecordOutcomeResponse};
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::Arc;

pub async fn handle(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RecordOutcomeRequest>, JsonRejection>,
) -> Result<Json<RecordOutcomeResponse>, ApiError> {
    let Json(request) = payload?;
    let response = state.service.record_outcome(request)?;
    Ok(Json(response))
}
