//! Administrative reset endpoint.

use axum::Json;
use axum::extract::State;
use serde_json::json;

use super::ApiState;
use crate::api::types::ApiError;

/// POST /api/reset — purge bookings and return all seats to FREE
pub async fn reset(State(state): State<ApiState>) -> Result<Json<serde_json::Value>, ApiError> {
    state.services.reset.reset().await?;
    Ok(Json(json!({ "message": "Database reset successfully" })))
}
