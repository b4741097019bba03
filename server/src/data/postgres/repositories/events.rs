//! Event repository.
//!
//! Events are read-mostly; listings are served by the search index, so the
//! store only needs creation and point lookups here.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::data::postgres::StoreError;
use crate::data::types::EventRow;

pub struct NewEvent<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub event_type: &'a str,
    pub datetime_start: DateTime<Utc>,
    pub provider: &'a str,
    pub external: bool,
}

/// Insert an event and return the stored row
pub async fn create(pool: &PgPool, event: &NewEvent<'_>) -> Result<EventRow, StoreError> {
    let row = sqlx::query_as::<_, EventRow>(
        r#"
        INSERT INTO events_archive (title, description, type, datetime_start, provider, external)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, title, description, type, datetime_start, provider, external, total_seats
        "#,
    )
    .bind(event.title)
    .bind(event.description)
    .bind(event.event_type)
    .bind(event.datetime_start)
    .bind(event.provider)
    .bind(event.external)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn get_by_id(pool: &PgPool, id: i64) -> Result<Option<EventRow>, StoreError> {
    let row = sqlx::query_as::<_, EventRow>(
        "SELECT id, title, description, type, datetime_start, provider, external, total_seats
         FROM events_archive
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
