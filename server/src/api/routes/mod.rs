//! HTTP route handlers.

pub mod bookings;
pub mod events;
pub mod health;
pub mod payments;
pub mod reset;
pub mod seats;

use std::sync::Arc;
use std::time::Duration;

use crate::data::cache::CacheService;
use crate::data::postgres::PostgresService;
use crate::data::search::SearchService;
use crate::domain::Services;

/// Shared state for all API handlers
#[derive(Clone)]
pub struct ApiState {
    pub services: Arc<Services>,
    pub store: Arc<PostgresService>,
    pub search: Arc<SearchService>,
    pub cache: Arc<CacheService>,
    pub events_cache_ttl: Duration,
}
