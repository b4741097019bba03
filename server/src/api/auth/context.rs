//! Authenticated-user request context.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::api::types::ApiError;

/// Identity attached to the request by the auth middleware.
///
/// Extracting it in a handler is the ownership anchor: every mutating
/// operation compares this id against the booking's owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or(ApiError::Unauthorized)
    }
}
