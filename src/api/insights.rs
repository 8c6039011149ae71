//! `GET /v1/insights` - point-in-time view of what the router has learned.

use super::{ApiError, AppState};
use crate::insights::{InsightsFilter, InsightsSnapshot};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use std::sync::Arc;

/// Filters come from the query string:
/// `?backend_id=ipfs&content_type=image/jpeg&time_window_hours=24`
pub async fn handle(
    State(state): State<Arc<AppState>>,
    query: Result<Query<InsightsFilter>, QueryRejection>,
) -> Result<Json<InsightsSnapshot>, ApiError> {
    let Query(filter) = query?;
    let snapshot = state.service.get_insights(&filter)?;
    Ok(Json(snapshot))
}
