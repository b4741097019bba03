//! Event operations.
//!
//! Listings come from the search index (relevance, fuzziness, date filter);
//! creation writes the store first and then indexes the document, accepting
//! eventual consistency between the two.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;

use crate::core::constants::EXTERNAL_EVENT_ID;
use crate::data::postgres::repositories::{events as event_repo, seats as seat_repo};
use crate::data::postgres::{PgPool, PostgresService};
use crate::data::search::SearchService;
use crate::data::types::EventRow;
use crate::domain::error::CoreError;

const DEFAULT_EVENT_TYPE: &str = "concert";
const DEFAULT_PROVIDER: &str = "Билеттер";

pub struct EventService {
    store: Arc<PostgresService>,
    search: Arc<SearchService>,
}

impl EventService {
    pub fn new(store: Arc<PostgresService>, search: Arc<SearchService>) -> Self {
        Self { store, search }
    }

    fn pool(&self) -> &PgPool {
        self.store.pool()
    }

    /// Create an event.
    ///
    /// Locally-owned events get a generated seat grid with randomized kopeck
    /// prices; the external event's inventory is synced from the provider by
    /// tooling instead.
    pub async fn create(&self, title: &str, external: bool) -> Result<i64, CoreError> {
        let event = event_repo::create(
            self.pool(),
            &event_repo::NewEvent {
                title,
                description: None,
                event_type: DEFAULT_EVENT_TYPE,
                datetime_start: Utc::now() + Duration::days(7),
                provider: DEFAULT_PROVIDER,
                external,
            },
        )
        .await?;

        if !external && event.id != EXTERNAL_EVENT_ID {
            let (rows, seats_per_row) = {
                let mut rng = rand::thread_rng();
                (rng.gen_range(10..=30), rng.gen_range(15..=30))
            };
            seat_repo::create_for_event(self.pool(), event.id, rows, seats_per_row).await?;
        }

        // The index is derived state; a failed write here degrades listings
        // until reindexing, not the create itself
        let doc = event_repo::get_by_id(self.pool(), event.id).await?;
        if let Some(doc) = doc
            && let Err(e) = self.search.index_event(&doc).await
        {
            tracing::error!(event_id = event.id, error = %e, "Failed to index event");
        }

        Ok(event.id)
    }

    /// Search-backed listing
    pub async fn list(
        &self,
        query: &str,
        date: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<EventRow>, CoreError> {
        Ok(self.search.search(query, date, page, page_size).await?)
    }
}
