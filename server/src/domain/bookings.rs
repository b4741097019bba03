//! Booking operations.
//!
//! The booking is the aggregate everything else hangs off: seats link to it,
//! payment state lives on it, and the external order id for event 1 is
//! persisted here. All mutations go through store transactions; bus messages
//! are published after the write commits.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::core::constants::EXTERNAL_EVENT_ID;
use crate::data::postgres::repositories::bookings as booking_repo;
use crate::data::postgres::repositories::seats as seat_repo;
use crate::data::postgres::{PgPool, PostgresService};
use crate::data::search::SearchService;
use crate::data::topics::TopicService;
use crate::data::types::{BookingRow, BookingStatus, PaymentOutcome, PaymentStatus, SeatRow};
use crate::domain::error::CoreError;
use crate::domain::messages::{self, subjects};
use crate::external::payment::PaymentClient;
use crate::external::ticketing::TicketingClient;
use crate::metrics;

/// Payment description shown to the payer
const PAYMENT_DESCRIPTION: &str = "Билет на мероприятие";

pub struct BookingService {
    store: Arc<PostgresService>,
    search: Arc<SearchService>,
    payment: Arc<PaymentClient>,
    ticketing: Arc<TicketingClient>,
    topics: Arc<TopicService>,
}

impl BookingService {
    pub fn new(
        store: Arc<PostgresService>,
        search: Arc<SearchService>,
        payment: Arc<PaymentClient>,
        ticketing: Arc<TicketingClient>,
        topics: Arc<TopicService>,
    ) -> Self {
        Self {
            store,
            search,
            payment,
            ticketing,
            topics,
        }
    }

    fn pool(&self) -> &PgPool {
        self.store.pool()
    }

    /// Create a booking for an event.
    ///
    /// The search index is the existence authority here. For the external
    /// event the provider order is opened up-front and the booking is
    /// pre-confirmed; seats are selected remotely later by the workflow.
    pub async fn create(&self, user_id: i64, event_id: i64) -> Result<i64, CoreError> {
        let event = self.search.get_by_id(event_id).await?;
        if event.is_none() {
            return Err(CoreError::not_found("event"));
        }

        let mut status = BookingStatus::Created;
        let mut payment_status = PaymentStatus::Pending;
        let mut order_id: Option<String> = None;

        if event_id == EXTERNAL_EVENT_ID {
            let order = self.ticketing.start_order().await?;
            tracing::debug!(order_id = %order.order_id, "Opened provider order for external booking");
            order_id = Some(order.order_id);
            status = BookingStatus::Confirmed;
            payment_status = PaymentStatus::Completed;
        }

        let booking = booking_repo::create(
            self.pool(),
            &booking_repo::NewBooking {
                event_id,
                user_id: Some(user_id),
                status,
                payment_status,
                total_amount: "0",
                order_id: order_id.as_deref(),
            },
        )
        .await?;

        metrics::BOOKINGS_CREATED_TOTAL.inc();

        messages::publish_logged(
            &self.topics,
            subjects::BOOKING_CREATED,
            &messages::BookingCreated {
                booking_id: booking.id,
                event_id,
                user_id: Some(user_id),
                timestamp: Utc::now(),
            },
        )
        .await;

        Ok(booking.id)
    }

    /// Bookings of the authenticated user, newest first
    pub async fn list(&self, user_id: i64) -> Result<Vec<BookingRow>, CoreError> {
        Ok(booking_repo::get_by_user(self.pool(), user_id).await?)
    }

    /// Initiate payment for a booking.
    ///
    /// Returns the gateway redirect URL, or `None` for the external event
    /// where payment is skipped and the booking confirms immediately.
    pub async fn initiate_payment(
        &self,
        user_id: i64,
        booking_id: i64,
    ) -> Result<Option<String>, CoreError> {
        let booking = self.owned_booking(user_id, booking_id).await?;

        let seats = booking_repo::get_seats(self.pool(), booking.id).await?;
        if seats.is_empty() {
            return Err(CoreError::Conflict("booking has no seats".into()));
        }

        let total = seat_total(&seats);
        let total_str = total.to_string();

        if booking.event_id == EXTERNAL_EVENT_ID {
            // No gateway involved: confirm immediately and let the workflow
            // sell the seats and confirm the provider order
            booking_repo::confirm_with_total(self.pool(), booking.id, &total_str).await?;
            messages::publish_logged(
                &self.topics,
                subjects::PAYMENT_COMPLETED,
                &messages::PaymentCompleted {
                    booking_id: booking.id,
                    payment_id: String::new(),
                    order_id: booking.order_id.clone().unwrap_or_default(),
                    timestamp: Utc::now(),
                },
            )
            .await;
            return Ok(None);
        }

        let order_id = Uuid::new_v4().to_string();
        let init = self
            .payment
            .init_payment(total, &order_id, "RUB", PAYMENT_DESCRIPTION)
            .await?;

        booking_repo::set_payment_info(
            self.pool(),
            booking.id,
            &init.payment_id,
            &order_id,
            &total_str,
        )
        .await?;

        messages::publish_logged(
            &self.topics,
            subjects::PAYMENT_INITIATED,
            &messages::PaymentInitiated {
                booking_id: booking.id,
                event_id: booking.event_id,
                total_amount: total,
                payment_id: init.payment_id.clone(),
                timestamp: Utc::now(),
            },
        )
        .await;

        Ok(Some(init.payment_url))
    }

    /// Cancel a booking: release its seats, void an initiated payment and
    /// move both state machines to CANCELLED.
    pub async fn cancel(&self, user_id: i64, booking_id: i64) -> Result<(), CoreError> {
        let booking = self.owned_booking(user_id, booking_id).await?;

        let seats = booking_repo::get_seats(self.pool(), booking.id).await?;
        for seat in &seats {
            if let Err(e) = seat_repo::release(self.pool(), &seat.id).await {
                tracing::error!(
                    booking_id = booking.id,
                    seat_id = %seat.id,
                    error = %e,
                    "Failed to release seat during cancellation"
                );
            }
        }

        if booking.payment_status().ok() == Some(PaymentStatus::Initiated)
            && let Some(ref payment_id) = booking.payment_id
            && let Err(e) = self
                .payment
                .cancel_payment(payment_id, "Booking cancelled by user")
                .await
        {
            tracing::error!(
                booking_id = booking.id,
                payment_id = %payment_id,
                error = %e,
                "Failed to cancel payment during cancellation"
            );
        }

        booking_repo::set_statuses(
            self.pool(),
            booking.id,
            BookingStatus::Cancelled,
            PaymentStatus::Cancelled,
        )
        .await?;

        messages::publish_logged(
            &self.topics,
            subjects::BOOKING_CANCELLED,
            &messages::BookingCancelled {
                booking_id: booking.id,
                event_id: booking.event_id,
                reason: "cancelled by user".into(),
                timestamp: Utc::now(),
            },
        )
        .await;

        Ok(())
    }

    /// Translate a gateway notification into a bus message.
    ///
    /// Reconciliation happens in the workflow; this stays cheap and
    /// idempotent so the gateway always gets its 200.
    pub async fn handle_payment_notification(
        &self,
        payment_id: &str,
        provider_status: &str,
    ) -> Result<(), CoreError> {
        let Some(outcome) = PaymentOutcome::from_provider_status(provider_status) else {
            tracing::info!(
                payment_id = %payment_id,
                status = %provider_status,
                "Ignoring non-terminal payment notification"
            );
            return Ok(());
        };

        let booking = booking_repo::get_by_payment_id(self.pool(), payment_id).await?;
        let Some(booking) = booking else {
            tracing::warn!(payment_id = %payment_id, "No booking for notified payment");
            return Ok(());
        };

        let order_id = booking.order_id.clone().unwrap_or_default();
        match outcome {
            PaymentOutcome::Completed => {
                messages::publish_logged(
                    &self.topics,
                    subjects::PAYMENT_COMPLETED,
                    &messages::PaymentCompleted {
                        booking_id: booking.id,
                        payment_id: payment_id.to_string(),
                        order_id,
                        timestamp: Utc::now(),
                    },
                )
                .await;
            }
            PaymentOutcome::Failed => {
                messages::publish_logged(
                    &self.topics,
                    subjects::PAYMENT_FAILED,
                    &messages::PaymentFailed {
                        booking_id: booking.id,
                        payment_id: payment_id.to_string(),
                        order_id,
                        reason: provider_status.to_string(),
                        timestamp: Utc::now(),
                    },
                )
                .await;
            }
        }

        Ok(())
    }

    async fn owned_booking(&self, user_id: i64, booking_id: i64) -> Result<BookingRow, CoreError> {
        let booking = booking_repo::get_by_id(self.pool(), booking_id)
            .await?
            .ok_or(CoreError::not_found("booking"))?;

        if !booking.is_owned_by(user_id) {
            return Err(CoreError::Forbidden);
        }

        Ok(booking)
    }
}

/// Total of the linked seats; seats without a price contribute 0
pub fn seat_total(seats: &[SeatRow]) -> i64 {
    seats.iter().filter_map(|s| s.price).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn seat(price: Option<i64>) -> SeatRow {
        SeatRow {
            id: Uuid::new_v4().to_string(),
            event_id: 2,
            row: 1,
            number: 1,
            status: "RESERVED".into(),
            price,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn total_sums_prices_treating_null_as_zero() {
        let seats = vec![seat(Some(5000)), seat(None), seat(Some(2500))];
        assert_eq!(seat_total(&seats), 7500);
    }

    #[test]
    fn total_of_no_seats_is_zero() {
        assert_eq!(seat_total(&[]), 0);
    }
}
