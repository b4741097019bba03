//! HTTP Basic authentication gate.
//!
//! Resolution order per request:
//! 1. Hash the presented password and look the `base64(email:hash)` field up
//!    in the users auth hash (bounded cache read).
//! 2. On miss or cache failure, load the user from the store by email,
//!    require it to be active, and compare hashes in constant time.
//!
//! The gate never mutates credentials or the cache; the hash is populated by
//! out-of-band provisioning. Rejections answer 401 with
//! `WWW-Authenticate: Basic realm="Restricted"`.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Basic;

use super::context::AuthUser;
use crate::api::types::ApiError;
use crate::data::cache::{CacheKey, CacheService};
use crate::data::postgres::PostgresService;
use crate::data::postgres::repositories::users as user_repo;
use crate::utils::crypto::{constant_time_eq, sha256_hex};

/// Shared auth state for the middleware
#[derive(Clone)]
pub struct AuthState {
    pub store: Arc<PostgresService>,
    pub cache: Arc<CacheService>,
    pub users_hash_key: String,
}

pub async fn basic_auth(
    State(state): State<AuthState>,
    credentials: Option<TypedHeader<Authorization<Basic>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(TypedHeader(Authorization(credentials))) = credentials else {
        return Err(ApiError::Unauthorized);
    };

    let email = credentials.username();
    if email.is_empty() {
        return Err(ApiError::Unauthorized);
    }

    let password_hash = sha256_hex(credentials.password());

    // Cache fast path. Any cache failure falls through to the store.
    let field = CacheKey::auth_field(email, &password_hash);
    match state.cache.hget(&state.users_hash_key, &field).await {
        Ok(Some(user_id)) => {
            if let Ok(user_id) = user_id.parse::<i64>() {
                request.extensions_mut().insert(AuthUser { user_id });
                return Ok(next.run(request).await);
            }
            tracing::warn!(field = %field, "Non-numeric user id in auth cache");
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(error = %e, "Auth cache lookup failed, falling back to store");
        }
    }

    // Store fallback
    let user = user_repo::get_by_email(state.store.pool(), email)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Auth store lookup failed");
            ApiError::Internal
        })?;

    let Some(user) = user else {
        return Err(ApiError::Unauthorized);
    };
    if !user.is_active || !constant_time_eq(&password_hash, &user.password_hash) {
        return Err(ApiError::Unauthorized);
    }

    request.extensions_mut().insert(AuthUser {
        user_id: user.user_id,
    });
    Ok(next.run(request).await)
}
