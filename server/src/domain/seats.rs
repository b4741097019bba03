//! Seat operations.
//!
//! Selection is the contended path: correctness comes entirely from the
//! store's row lock plus the `(booking_id, seat_id)` uniqueness, never from
//! in-process coordination. The store is authoritative for every event,
//! including the external one (its rows are populated by the sync tool);
//! the provider's place-status follows local status via the workflow, never
//! the other way round.

use std::sync::Arc;

use chrono::Utc;

use crate::data::postgres::repositories::{
    bookings as booking_repo, events as event_repo, seats as seat_repo,
};
use crate::data::postgres::{PgPool, PostgresService};
use crate::data::topics::TopicService;
use crate::data::types::SeatStatus;
use crate::domain::error::CoreError;
use crate::domain::messages::{self, subjects};
use crate::metrics;

/// One row of a seat listing
#[derive(Debug, Clone)]
pub struct SeatListing {
    pub id: String,
    pub row: i32,
    pub number: i32,
    pub status: String,
    pub price: Option<i64>,
}

pub struct SeatService {
    store: Arc<PostgresService>,
    topics: Arc<TopicService>,
}

impl SeatService {
    pub fn new(store: Arc<PostgresService>, topics: Arc<TopicService>) -> Self {
        Self { store, topics }
    }

    fn pool(&self) -> &PgPool {
        self.store.pool()
    }

    /// List seats for an event, paginated in (row, number) order.
    ///
    /// Served from the store for every event so a seat reserved a moment
    /// ago is never reported FREE, and the row/status filters apply
    /// uniformly.
    pub async fn list(
        &self,
        event_id: i64,
        page: u32,
        page_size: u32,
        row: Option<i32>,
        status: Option<SeatStatus>,
    ) -> Result<Vec<SeatListing>, CoreError> {
        let event = event_repo::get_by_id(self.pool(), event_id).await?;
        if event.is_none() {
            return Err(CoreError::not_found("event"));
        }

        let seats =
            seat_repo::get_by_event(self.pool(), event_id, page, page_size, row, status).await?;

        Ok(seats
            .into_iter()
            .map(|s| SeatListing {
                id: s.id,
                row: s.row,
                number: s.number,
                status: s.status,
                price: s.price,
            })
            .collect())
    }

    /// Reserve a seat into a booking.
    ///
    /// Exactly one of any set of concurrent callers succeeds; the rest see
    /// `SeatNotAvailable`. For the external event the provider order is
    /// brought in line asynchronously by the payment-completed sync.
    pub async fn select(
        &self,
        user_id: i64,
        booking_id: i64,
        seat_id: &str,
    ) -> Result<(), CoreError> {
        let booking = booking_repo::get_by_id(self.pool(), booking_id)
            .await?
            .ok_or(CoreError::not_found("booking"))?;

        if !booking.is_owned_by(user_id) {
            return Err(CoreError::Forbidden);
        }

        let seat = seat_repo::get_by_id(self.pool(), seat_id)
            .await?
            .ok_or(CoreError::not_found("seat"))?;

        if seat.event_id != booking.event_id {
            return Err(CoreError::Conflict(
                "seat belongs to a different event".into(),
            ));
        }

        // A terminal booking must never regain seat links
        if booking.status().map(|s| s.is_terminal()).unwrap_or(false) {
            return Err(CoreError::Conflict("booking is no longer active".into()));
        }

        match seat_repo::reserve(self.pool(), seat_id, booking_id).await {
            Ok(()) => {
                metrics::SEAT_RESERVATIONS_TOTAL
                    .with_label_values(&["reserved"])
                    .inc();
            }
            Err(e) => {
                metrics::SEAT_RESERVATIONS_TOTAL
                    .with_label_values(&["rejected"])
                    .inc();
                return Err(e.into());
            }
        }

        messages::publish_logged(
            &self.topics,
            subjects::SEAT_SELECTED,
            &messages::SeatSelected {
                booking_id,
                seat_id: seat_id.to_string(),
                event_id: booking.event_id,
                timestamp: Utc::now(),
            },
        )
        .await;

        Ok(())
    }

    /// Release a seat held by the caller's booking
    pub async fn release(&self, user_id: i64, seat_id: &str) -> Result<(), CoreError> {
        let booking = booking_repo::get_active_for_seat(self.pool(), seat_id)
            .await?
            .ok_or(CoreError::not_found("seat reservation"))?;

        if !booking.is_owned_by(user_id) {
            return Err(CoreError::Forbidden);
        }

        seat_repo::release(self.pool(), seat_id).await?;

        messages::publish_logged(
            &self.topics,
            subjects::SEAT_RELEASED,
            &messages::SeatReleased {
                booking_id: booking.id,
                seat_id: seat_id.to_string(),
                event_id: booking.event_id,
                timestamp: Utc::now(),
            },
        )
        .await;

        Ok(())
    }
}
