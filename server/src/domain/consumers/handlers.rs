//! Per-subject workflow handlers.
//!
//! Each handler is the side-effect half of a bus message. Returning `Ok`
//! acks the message; returning `Err` leaves it pending for redelivery after
//! the ack-wait. Handlers are idempotent: status moves are CAS-style in the
//! store and seat transitions are guarded by the current status.

use std::sync::Arc;

use crate::core::constants::EXTERNAL_EVENT_ID;
use crate::data::postgres::PostgresService;
use crate::data::postgres::repositories::{bookings as booking_repo, seats as seat_repo};
use crate::data::types::{BookingStatus, PaymentStatus};
use crate::domain::error::CoreError;
use crate::domain::messages::{
    BookingCancelled, BookingCreated, BookingExpired, PaymentCompleted, PaymentFailed,
    PaymentInitiated, SeatReleased, SeatSelected,
};
use crate::external::ticketing::TicketingClient;

use super::external_sync::sync_external_order;

pub struct WorkflowHandlers {
    store: Arc<PostgresService>,
    ticketing: Arc<TicketingClient>,
}

impl WorkflowHandlers {
    pub fn new(store: Arc<PostgresService>, ticketing: Arc<TicketingClient>) -> Self {
        Self { store, ticketing }
    }

    /// booking.created: observer hook (analytics attachment point)
    pub async fn booking_created(&self, msg: BookingCreated) -> Result<(), CoreError> {
        tracing::debug!(
            booking_id = msg.booking_id,
            event_id = msg.event_id,
            "Booking created"
        );
        Ok(())
    }

    /// payment.initiated: make sure the booking reflects the initiation.
    /// The CAS guard makes duplicates and reorders harmless.
    pub async fn payment_initiated(&self, msg: PaymentInitiated) -> Result<(), CoreError> {
        let moved = booking_repo::set_payment_initiated(self.store.pool(), msg.booking_id).await?;
        if moved {
            tracing::debug!(booking_id = msg.booking_id, "Payment marked initiated");
        }
        Ok(())
    }

    /// payment.completed: confirm the booking, sell its seats, and for the
    /// external event drive the provider order to confirmation. Ack only
    /// after the last side effect succeeded.
    pub async fn payment_completed(&self, msg: PaymentCompleted) -> Result<(), CoreError> {
        let pool = self.store.pool();

        let Some(booking) = booking_repo::get_by_id(pool, msg.booking_id).await? else {
            tracing::warn!(booking_id = msg.booking_id, "payment.completed for unknown booking");
            return Ok(());
        };

        booking_repo::confirm(pool, booking.id).await?;

        let seats = booking_repo::get_seats(pool, booking.id).await?;
        for seat in &seats {
            seat_repo::mark_sold(pool, &seat.id).await?;
        }

        if booking.event_id == EXTERNAL_EVENT_ID {
            sync_external_order(&self.store, &self.ticketing, &booking).await?;
        }

        tracing::info!(
            booking_id = booking.id,
            seats = seats.len(),
            "Booking confirmed after payment"
        );
        Ok(())
    }

    /// payment.failed: cancel the booking and free its seats; best-effort
    /// cancel of the provider order for the external event.
    pub async fn payment_failed(&self, msg: PaymentFailed) -> Result<(), CoreError> {
        let pool = self.store.pool();

        let Some(booking) = booking_repo::get_by_id(pool, msg.booking_id).await? else {
            tracing::warn!(booking_id = msg.booking_id, "payment.failed for unknown booking");
            return Ok(());
        };

        booking_repo::set_statuses(
            pool,
            booking.id,
            BookingStatus::Cancelled,
            PaymentStatus::Failed,
        )
        .await?;

        let seats = booking_repo::get_seats(pool, booking.id).await?;
        for seat in &seats {
            seat_repo::release(pool, &seat.id).await?;
        }

        if booking.event_id == EXTERNAL_EVENT_ID
            && let Some(ref order_id) = booking.order_id
            && let Err(e) = self.ticketing.cancel_order(order_id).await
        {
            tracing::error!(
                booking_id = booking.id,
                order_id = %order_id,
                error = %e,
                "Provider order cancel failed after payment failure"
            );
        }

        tracing::info!(
            booking_id = booking.id,
            reason = %msg.reason,
            "Booking cancelled after failed payment"
        );
        Ok(())
    }

    /// seat.selected: observer hook. Remote selection for the external
    /// event happens exactly once, in the payment-completed sync, so two
    /// code paths never race on the same provider order.
    pub async fn seat_selected(&self, msg: SeatSelected) -> Result<(), CoreError> {
        tracing::debug!(
            seat_id = %msg.seat_id,
            booking_id = msg.booking_id,
            event_id = msg.event_id,
            "Seat selected"
        );
        Ok(())
    }

    /// seat.released: for the external event, free the provider place
    pub async fn seat_released(&self, msg: SeatReleased) -> Result<(), CoreError> {
        if msg.event_id != EXTERNAL_EVENT_ID {
            tracing::debug!(seat_id = %msg.seat_id, "Seat released");
            return Ok(());
        }

        if let Err(e) = self.ticketing.release_place(&msg.seat_id).await {
            tracing::error!(place_id = %msg.seat_id, error = %e, "Provider place release failed");
        }
        Ok(())
    }

    /// booking.cancelled: observer hook; the caller already applied the
    /// cancellation side effects
    pub async fn booking_cancelled(&self, msg: BookingCancelled) -> Result<(), CoreError> {
        tracing::debug!(booking_id = msg.booking_id, reason = %msg.reason, "Booking cancelled");
        Ok(())
    }

    /// booking.expired: observer hook; the expirer already released seats
    pub async fn booking_expired(&self, msg: BookingExpired) -> Result<(), CoreError> {
        tracing::debug!(booking_id = msg.booking_id, reason = %msg.reason, "Booking expired");
        Ok(())
    }
}
