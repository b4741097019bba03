//! Validation extractors.
//!
//! `ValidatedJson` and `ValidatedQuery` deserialize and then run the
//! `validator` rules, turning both failure modes into a 400 with a short
//! error body.

use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use validator::Validate;

use super::types::ApiError;

pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;

        value
            .validate()
            .map_err(|e| ApiError::bad_request(flatten_errors(&e)))?;

        Ok(Self(value))
    }
}

pub struct ValidatedQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;

        value
            .validate()
            .map_err(|e| ApiError::bad_request(flatten_errors(&e)))?;

        Ok(Self(value))
    }
}

/// Render validation errors as one short line
fn flatten_errors(errors: &validator::ValidationErrors) -> String {
    let mut parts: Vec<String> = Vec::new();
    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            match &error.message {
                Some(msg) => parts.push(msg.to_string()),
                None => parts.push(format!("invalid value for {field}")),
            }
        }
    }
    parts.sort();
    parts.join("; ")
}
