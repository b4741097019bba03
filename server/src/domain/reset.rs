//! Administrative reset.
//!
//! Purges every booking and link and returns the full seat inventory to
//! FREE, then drops the cached listing bodies so the read path cannot serve
//! pre-reset state.

use std::sync::Arc;

use crate::data::cache::{CacheKey, CacheService};
use crate::data::postgres::{PostgresService, repositories};
use crate::domain::error::CoreError;

pub struct ResetService {
    store: Arc<PostgresService>,
    cache: Arc<CacheService>,
}

impl ResetService {
    pub fn new(store: Arc<PostgresService>, cache: Arc<CacheService>) -> Self {
        Self { store, cache }
    }

    pub async fn reset(&self) -> Result<(), CoreError> {
        tracing::info!("Starting database reset");

        repositories::reset_all(self.store.pool()).await?;
        tracing::info!("All bookings deleted, seats returned to FREE");

        match self
            .cache
            .invalidate_pattern(CacheKey::events_list_pattern())
            .await
        {
            Ok(n) => tracing::info!(keys = n, "Invalidated events-listing cache"),
            Err(e) => tracing::warn!(error = %e, "Events-listing cache invalidation failed"),
        }

        Ok(())
    }
}
