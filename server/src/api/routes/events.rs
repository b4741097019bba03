//! Events endpoints: cached listing and event creation.

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::ApiState;
use crate::api::extractors::{ValidatedJson, ValidatedQuery};
use crate::api::types::{ApiError, FlexibleBool};
use crate::core::constants::{DEFAULT_EVENTS_PAGE_SIZE, DEFAULT_PAGE, MAX_PAGE_SIZE};
use crate::data::cache::CacheKey;
use crate::metrics;

#[derive(Debug, Deserialize, Validate)]
pub struct ListEventsQuery {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub date: String,
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "page must be >= 1"))]
    pub page: u32,
    #[serde(default = "default_page_size", rename = "pageSize")]
    #[validate(custom(function = "validate_page_size"))]
    pub page_size: u32,
}

fn default_page() -> u32 {
    DEFAULT_PAGE
}

fn default_page_size() -> u32 {
    DEFAULT_EVENTS_PAGE_SIZE
}

fn validate_page_size(page_size: u32) -> Result<(), ValidationError> {
    if page_size < 1 || page_size > MAX_PAGE_SIZE {
        return Err(ValidationError::new("page_size_range")
            .with_message("pageSize must be between 1 and 20".into()));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct EventListItem {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    #[serde(default)]
    pub external: Option<FlexibleBool>,
}

#[derive(Debug, Serialize)]
pub struct CreateEventResponse {
    pub id: i64,
}

/// Cache only the plain listing: no text query, no date filter, and a page
/// size aligned to the warmed grid (positive multiple of 5).
pub fn should_cache(query: &str, date: &str, page_size: u32) -> bool {
    query.is_empty() && date.is_empty() && page_size > 0 && page_size % 5 == 0
}

/// GET /api/events
///
/// Cache hits stream the stored body untouched, so a cached response is
/// bit-for-bit the body that was originally computed.
pub async fn list_events(
    State(state): State<ApiState>,
    ValidatedQuery(params): ValidatedQuery<ListEventsQuery>,
) -> Result<Response, ApiError> {
    let cacheable = should_cache(&params.query, &params.date, params.page_size);
    let cache_key = CacheKey::events_list(params.page, params.page_size);

    if cacheable {
        match state.cache.get_raw(&cache_key).await {
            Ok(Some(body)) => {
                metrics::EVENTS_CACHE_LOOKUPS_TOTAL
                    .with_label_values(&["hit"])
                    .inc();
                tracing::debug!(page = params.page, page_size = params.page_size, "Events cache hit");
                return Ok(json_bytes_response(body));
            }
            Ok(None) => {
                metrics::EVENTS_CACHE_LOOKUPS_TOTAL
                    .with_label_values(&["miss"])
                    .inc();
            }
            Err(e) => {
                metrics::EVENTS_CACHE_LOOKUPS_TOTAL
                    .with_label_values(&["error"])
                    .inc();
                tracing::warn!(error = %e, "Events cache read failed, serving from search");
            }
        }
    }

    let events = state
        .services
        .events
        .list(&params.query, &params.date, params.page, params.page_size)
        .await?;

    let items: Vec<EventListItem> = events
        .into_iter()
        .map(|e| EventListItem {
            id: e.id,
            title: e.title,
        })
        .collect();

    let body = serde_json::to_vec(&items).map_err(|e| {
        tracing::error!(error = %e, "Failed to encode events listing");
        ApiError::Internal
    })?;

    if cacheable {
        state
            .cache
            .set_detached(cache_key, body.clone(), state.events_cache_ttl);
    }

    Ok(json_bytes_response(body))
}

/// POST /api/events
pub async fn create_event(
    State(state): State<ApiState>,
    ValidatedJson(request): ValidatedJson<CreateEventRequest>,
) -> Result<(StatusCode, Json<CreateEventResponse>), ApiError> {
    let external = request.external.unwrap_or_default().as_bool();
    let id = state.services.events.create(&request.title, external).await?;
    Ok((StatusCode::CREATED, Json(CreateEventResponse { id })))
}

fn json_bytes_response(body: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_policy_requires_plain_query_and_aligned_page_size() {
        assert!(should_cache("", "", 5));
        assert!(should_cache("", "", 10));
        assert!(should_cache("", "", 20));

        assert!(!should_cache("foo", "", 10));
        assert!(!should_cache("", "2026-08-01", 10));
        assert!(!should_cache("", "", 7));
        assert!(!should_cache("", "", 0));
    }

    #[test]
    fn page_size_validation_bounds() {
        assert!(validate_page_size(1).is_ok());
        assert!(validate_page_size(20).is_ok());
        assert!(validate_page_size(0).is_err());
        assert!(validate_page_size(21).is_err());
    }
}
