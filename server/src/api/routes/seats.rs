//! Seats endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::ApiState;
use crate::api::auth::AuthUser;
use crate::api::extractors::{ValidatedJson, ValidatedQuery};
use crate::api::types::ApiError;
use crate::core::constants::{DEFAULT_PAGE, DEFAULT_SEATS_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::data::types::SeatStatus;

#[derive(Debug, Deserialize, Validate)]
pub struct ListSeatsQuery {
    pub event_id: i64,
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "page must be >= 1"))]
    pub page: u32,
    #[serde(default = "default_page_size", rename = "pageSize")]
    #[validate(custom(function = "validate_page_size"))]
    pub page_size: u32,
    pub row: Option<i32>,
    pub status: Option<String>,
}

fn default_page() -> u32 {
    DEFAULT_PAGE
}

fn default_page_size() -> u32 {
    DEFAULT_SEATS_PAGE_SIZE
}

fn validate_page_size(page_size: u32) -> Result<(), ValidationError> {
    if page_size < 1 || page_size > MAX_PAGE_SIZE {
        return Err(ValidationError::new("page_size_range")
            .with_message("pageSize must be between 1 and 20".into()));
    }
    Ok(())
}

/// Seat listing row. Price is a decimal string of integer minor units.
#[derive(Debug, Serialize)]
pub struct SeatListItem {
    pub id: String,
    pub row: i32,
    pub number: i32,
    pub status: String,
    pub price: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SelectSeatRequest {
    #[validate(range(min = 1, message = "booking_id must be positive"))]
    pub booking_id: i64,
    #[validate(length(min = 1, message = "seat_id must not be empty"))]
    pub seat_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReleaseSeatRequest {
    #[validate(length(min = 1, message = "seat_id must not be empty"))]
    pub seat_id: String,
}

/// GET /api/seats
pub async fn list_seats(
    State(state): State<ApiState>,
    _user: AuthUser,
    ValidatedQuery(params): ValidatedQuery<ListSeatsQuery>,
) -> Result<Json<Vec<SeatListItem>>, ApiError> {
    if params.event_id < 1 {
        return Err(ApiError::bad_request("event_id is required"));
    }

    let status = match params.status.as_deref() {
        None => None,
        Some(raw) => Some(
            raw.parse::<SeatStatus>()
                .map_err(|_| ApiError::bad_request("status must be FREE, RESERVED or SOLD"))?,
        ),
    };

    let seats = state
        .services
        .seats
        .list(
            params.event_id,
            params.page,
            params.page_size,
            params.row,
            status,
        )
        .await?;

    Ok(Json(
        seats
            .into_iter()
            .map(|s| SeatListItem {
                id: s.id,
                row: s.row,
                number: s.number,
                status: s.status,
                price: s.price.unwrap_or(0).to_string(),
            })
            .collect(),
    ))
}

/// PATCH /api/seats/select — 419 when the seat is not FREE
pub async fn select_seat(
    State(state): State<ApiState>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<SelectSeatRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .services
        .seats
        .select(user.user_id, request.booking_id, &request.seat_id)
        .await?;
    Ok(StatusCode::OK)
}

/// PATCH /api/seats/release
pub async fn release_seat(
    State(state): State<ApiState>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<ReleaseSeatRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .services
        .seats
        .release(user.user_id, &request.seat_id)
        .await?;
    Ok(StatusCode::OK)
}
