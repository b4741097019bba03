//! Shared API types: error mapping and lenient request scalars.

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;

use crate::domain::CoreError;

/// Status for a seat that was not FREE at reservation time. Intentional and
/// load-bearing: the deployed surface answers 419 and clients match on it.
const SEAT_NOT_AVAILABLE: u16 = 419;

/// API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    Forbidden,
    NotFound(String),
    Conflict(String),
    SeatNotAvailable(String),
    ServiceUnavailable(String),
    Internal,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Unauthorized => ApiError::Unauthorized,
            CoreError::Forbidden => ApiError::Forbidden,
            CoreError::NotFound { entity } => ApiError::NotFound(format!("{entity} not found")),
            CoreError::Conflict(msg) => ApiError::Conflict(msg),
            CoreError::SeatNotAvailable { seat_id } => {
                ApiError::SeatNotAvailable(format!("seat {seat_id} is not available"))
            }
            CoreError::Validation(msg) => ApiError::BadRequest(msg),
            CoreError::Unavailable(msg) => {
                tracing::error!(error = %msg, "Dependency unavailable");
                ApiError::ServiceUnavailable("service temporarily unavailable".into())
            }
            CoreError::Store(e) => {
                tracing::error!(error = %e, "Store error");
                ApiError::Internal
            }
            CoreError::Search(e) => {
                tracing::error!(error = %e, "Search error");
                ApiError::Internal
            }
            CoreError::External(e) => {
                tracing::error!(error = %e, "External provider error");
                ApiError::Internal
            }
            CoreError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"Restricted\"")],
                Json(json!({ "error": "Unauthorized" })),
            )
                .into_response(),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "Forbidden" })),
            )
                .into_response(),
            Self::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            Self::Conflict(message) => {
                (StatusCode::CONFLICT, Json(json!({ "error": message }))).into_response()
            }
            Self::SeatNotAvailable(message) => (
                StatusCode::from_u16(SEAT_NOT_AVAILABLE).expect("419 is a valid status code"),
                Json(json!({ "error": message })),
            )
                .into_response(),
            // 5xx responses carry no detail
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

/// Lenient boolean for the create-event request: accepts booleans, 0/1
/// numbers and the usual truthy/falsy strings, case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlexibleBool(pub bool);

impl FlexibleBool {
    pub fn as_bool(self) -> bool {
        self.0
    }
}

impl<'de> Deserialize<'de> for FlexibleBool {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        let parsed = match &value {
            serde_json::Value::Bool(b) => Some(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            serde_json::Value::String(s) => match s.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        };

        parsed.map(FlexibleBool).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid boolean value: {value}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Wrapper {
        external: FlexibleBool,
    }

    fn parse(json: &str) -> Result<bool, serde_json::Error> {
        serde_json::from_str::<Wrapper>(json).map(|w| w.external.as_bool())
    }

    #[test]
    fn flexible_bool_accepts_many_shapes() {
        for truthy in [
            r#"{"external": true}"#,
            r#"{"external": 1}"#,
            r#"{"external": "1"}"#,
            r#"{"external": "Yes"}"#,
            r#"{"external": "ON"}"#,
        ] {
            assert!(parse(truthy).unwrap(), "{truthy}");
        }
        for falsy in [
            r#"{"external": false}"#,
            r#"{"external": 0}"#,
            r#"{"external": "no"}"#,
            r#"{"external": "Off"}"#,
            r#"{"external": "FALSE"}"#,
        ] {
            assert!(!parse(falsy).unwrap(), "{falsy}");
        }
    }

    #[test]
    fn flexible_bool_rejects_garbage() {
        assert!(parse(r#"{"external": "maybe"}"#).is_err());
        assert!(parse(r#"{"external": 2}"#).is_err());
        assert!(parse(r#"{"external": null}"#).is_err());
    }

    #[test]
    fn seat_not_available_maps_to_419() {
        let response = ApiError::SeatNotAvailable("seat s1 is not available".into()).into_response();
        assert_eq!(response.status().as_u16(), 419);
    }

    #[test]
    fn internal_errors_carry_no_detail() {
        let response = ApiError::Internal.into_response();
        assert_eq!(response.status().as_u16(), 500);
    }

    #[test]
    fn core_errors_map_to_expected_kinds() {
        assert!(matches!(
            ApiError::from(CoreError::Forbidden),
            ApiError::Forbidden
        ));
        assert!(matches!(
            ApiError::from(CoreError::not_found("booking")),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(CoreError::SeatNotAvailable { seat_id: "x".into() }),
            ApiError::SeatNotAvailable(_)
        ));
        assert!(matches!(
            ApiError::from(CoreError::Conflict("mismatch".into())),
            ApiError::Conflict(_)
        ));
    }
}
