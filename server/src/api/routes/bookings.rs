//! Bookings endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::ApiState;
use crate::api::auth::AuthUser;
use crate::api::extractors::ValidatedJson;
use crate::api::types::ApiError;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    #[validate(range(min = 1, message = "event_id must be positive"))]
    pub event_id: i64,
}

#[derive(Debug, Serialize)]
pub struct CreateBookingResponse {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct BookingListItem {
    pub id: i64,
    pub event_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct InitiatePaymentRequest {
    #[validate(range(min = 1, message = "booking_id must be positive"))]
    pub booking_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CancelBookingRequest {
    #[validate(range(min = 1, message = "booking_id must be positive"))]
    pub booking_id: i64,
}

/// POST /api/bookings
pub async fn create_booking(
    State(state): State<ApiState>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), ApiError> {
    let id = state
        .services
        .bookings
        .create(user.user_id, request.event_id)
        .await?;
    Ok((StatusCode::CREATED, Json(CreateBookingResponse { id })))
}

/// GET /api/bookings — scoped to the authenticated user
pub async fn list_bookings(
    State(state): State<ApiState>,
    user: AuthUser,
) -> Result<Json<Vec<BookingListItem>>, ApiError> {
    let bookings = state.services.bookings.list(user.user_id).await?;
    Ok(Json(
        bookings
            .into_iter()
            .map(|b| BookingListItem {
                id: b.id,
                event_id: b.event_id,
            })
            .collect(),
    ))
}

/// PATCH /api/bookings/initiatePayment
///
/// 302 with the gateway URL in Location, or a plain 200 for the external
/// event where no payment is needed.
pub async fn initiate_payment(
    State(state): State<ApiState>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<InitiatePaymentRequest>,
) -> Result<Response, ApiError> {
    let payment_url = state
        .services
        .bookings
        .initiate_payment(user.user_id, request.booking_id)
        .await?;

    match payment_url {
        Some(url) => {
            let location = url.parse::<header::HeaderValue>().map_err(|_| {
                tracing::error!("Payment gateway returned a non-header-safe URL");
                ApiError::Internal
            })?;
            Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
        }
        None => Ok(StatusCode::OK.into_response()),
    }
}

/// PATCH /api/bookings/cancel
pub async fn cancel_booking(
    State(state): State<ApiState>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<CancelBookingRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .services
        .bookings
        .cancel(user.user_id, request.booking_id)
        .await?;
    Ok(StatusCode::OK)
}
