//! Reservation expiration sweep.
//!
//! Every 30 seconds, bookings still CREATED/PENDING past the 15-minute
//! reservation window are cancelled and their seats freed. Failures are
//! logged and retried on the next tick; the sweep itself must never die.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::constants::{BOOKING_EXPIRATION_MIN, EXPIRATION_CHECK_INTERVAL_SECS};
use crate::data::postgres::PostgresService;
use crate::data::postgres::repositories::{bookings as booking_repo, seats as seat_repo};
use crate::data::topics::TopicService;
use crate::data::types::{BookingRow, BookingStatus, PaymentStatus};
use crate::domain::messages::{self, subjects};
use crate::metrics;

pub struct ExpirationJob {
    store: Arc<PostgresService>,
    topics: Arc<TopicService>,
}

impl ExpirationJob {
    pub fn new(store: Arc<PostgresService>, topics: Arc<TopicService>) -> Self {
        Self { store, topics }
    }

    /// Spawn the sweep task. The first sweep runs immediately.
    pub fn start(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tracing::info!(
            interval_secs = EXPIRATION_CHECK_INTERVAL_SECS,
            window_min = BOOKING_EXPIRATION_MIN,
            "Starting booking expiration job"
        );

        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_secs(EXPIRATION_CHECK_INTERVAL_SECS));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            tracing::info!("Booking expiration job stopped");
                            return;
                        }
                    }
                    _ = ticker.tick() => {
                        let timer = metrics::EXPIRATION_SWEEP_DURATION.start_timer();
                        self.sweep().await;
                        timer.observe_duration();
                    }
                }
            }
        })
    }

    async fn sweep(&self) {
        let cutoff = Utc::now() - chrono::Duration::minutes(BOOKING_EXPIRATION_MIN);

        let expired = match booking_repo::get_expired(self.store.pool(), cutoff).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(error = %e, "Failed to query expired bookings");
                return;
            }
        };

        if expired.is_empty() {
            tracing::debug!("No expired bookings found");
            return;
        }

        tracing::info!(count = expired.len(), "Expiring stale bookings");

        for booking in expired {
            match self.expire_booking(&booking).await {
                Ok(released) => {
                    metrics::BOOKINGS_EXPIRED_TOTAL.inc();
                    tracing::info!(
                        booking_id = booking.id,
                        event_id = booking.event_id,
                        seats_released = released,
                        "Booking expired"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        booking_id = booking.id,
                        error = %e,
                        "Failed to expire booking, will retry next tick"
                    );
                }
            }
        }
    }

    async fn expire_booking(&self, booking: &BookingRow) -> anyhow::Result<usize> {
        let pool = self.store.pool();

        let seats = booking_repo::get_seats(pool, booking.id).await?;
        for seat in &seats {
            if let Err(e) = seat_repo::release(pool, &seat.id).await {
                tracing::error!(
                    booking_id = booking.id,
                    seat_id = %seat.id,
                    error = %e,
                    "Failed to release seat during expiration"
                );
            }
        }

        booking_repo::set_statuses(
            pool,
            booking.id,
            BookingStatus::Cancelled,
            PaymentStatus::Cancelled,
        )
        .await?;

        messages::publish_logged(
            &self.topics,
            subjects::BOOKING_EXPIRED,
            &messages::BookingExpired {
                booking_id: booking.id,
                event_id: booking.event_id,
                user_id: booking.user_id,
                reason: format!("{}-minute reservation window exceeded", BOOKING_EXPIRATION_MIN),
                timestamp: Utc::now(),
            },
        )
        .await;

        Ok(seats.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutoff_is_fifteen_minutes_back() {
        let before = Utc::now();
        let cutoff = before - chrono::Duration::minutes(BOOKING_EXPIRATION_MIN);
        let window = before.signed_duration_since(cutoff);
        assert_eq!(window.num_minutes(), 15);
    }
}
