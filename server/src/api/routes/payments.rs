//! Payments endpoints: gateway redirects and the notification webhook.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use validator::Validate;

use super::ApiState;
use crate::api::extractors::ValidatedJson;
use crate::api::types::ApiError;

#[derive(Debug, Deserialize)]
pub struct OrderIdQuery {
    #[serde(default, rename = "orderId")]
    pub order_id: String,
}

/// Gateway webhook body. `data` is passed through opaque.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentNotification {
    #[validate(length(min = 1, message = "paymentId is required"))]
    pub payment_id: String,
    #[validate(length(min = 1, message = "status is required"))]
    pub status: String,
    #[serde(default)]
    pub team_slug: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// GET /api/payments/success — payer landed back after a successful payment
pub async fn payment_success(
    Query(params): Query<OrderIdQuery>,
) -> Result<StatusCode, ApiError> {
    if params.order_id.is_empty() {
        return Err(ApiError::bad_request("orderId is required"));
    }
    tracing::info!(order_id = %params.order_id, "Payment success redirect");
    Ok(StatusCode::OK)
}

/// GET /api/payments/fail — payer landed back after a failed payment
pub async fn payment_fail(Query(params): Query<OrderIdQuery>) -> Result<StatusCode, ApiError> {
    if params.order_id.is_empty() {
        return Err(ApiError::bad_request("orderId is required"));
    }
    tracing::warn!(order_id = %params.order_id, "Payment failure redirect");
    Ok(StatusCode::OK)
}

/// POST /api/payments/notifications
///
/// Translates the provider status onto the bus and answers 200 regardless
/// of outcome; reconciliation happens in the workflow so the webhook stays
/// cheap and idempotent.
pub async fn payment_notifications(
    State(state): State<ApiState>,
    ValidatedJson(notification): ValidatedJson<PaymentNotification>,
) -> Result<StatusCode, ApiError> {
    tracing::info!(
        payment_id = %notification.payment_id,
        status = %notification.status,
        "Received payment notification"
    );

    state
        .services
        .bookings
        .handle_payment_notification(&notification.payment_id, &notification.status)
        .await?;

    Ok(StatusCode::OK)
}
