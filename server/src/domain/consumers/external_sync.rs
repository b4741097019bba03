//! External-order sync for the provider-backed event.
//!
//! Runs from the `payment.completed` consumer. Drives the provider order to
//! CONFIRMED for every seat of the booking; on any step failing the order is
//! cancelled so remotely-reserved places are freed, and the error propagates
//! so the message stays unacked and is redelivered.

use std::sync::Arc;

use crate::data::postgres::PostgresService;
use crate::data::postgres::repositories::bookings as booking_repo;
use crate::data::types::BookingRow;
use crate::domain::error::CoreError;
use crate::external::ticketing::TicketingClient;

pub async fn sync_external_order(
    store: &Arc<PostgresService>,
    ticketing: &Arc<TicketingClient>,
    booking: &BookingRow,
) -> Result<(), CoreError> {
    let pool = store.pool();

    // Reuse the booking's order when it already has one (opened at create
    // time); otherwise start fresh.
    let order_id = match &booking.order_id {
        Some(id) if !id.is_empty() => id.clone(),
        _ => {
            let order = ticketing.start_order().await?;
            tracing::info!(
                booking_id = booking.id,
                order_id = %order.order_id,
                "Started provider order"
            );
            order.order_id
        }
    };

    let seats = booking_repo::get_seats(pool, booking.id).await?;
    if seats.is_empty() {
        return Err(CoreError::Conflict(format!(
            "no seats linked to booking {}",
            booking.id
        )));
    }

    for seat in &seats {
        if let Err(e) = ticketing.select_place(&seat.id, &order_id).await {
            cancel_order_best_effort(ticketing, &order_id).await;
            tracing::error!(
                booking_id = booking.id,
                place_id = %seat.id,
                error = %e,
                "Provider place selection failed, order cancelled"
            );
            return Err(e.into());
        }
        tracing::debug!(place_id = %seat.id, order_id = %order_id, "Selected provider place");
    }

    if let Err(e) = ticketing.submit_order(&order_id).await {
        cancel_order_best_effort(ticketing, &order_id).await;
        return Err(e.into());
    }

    if let Err(e) = ticketing.confirm_order(&order_id).await {
        cancel_order_best_effort(ticketing, &order_id).await;
        return Err(e.into());
    }

    // The remote order is confirmed; losing this write is recoverable (the
    // id is also carried on later messages), so it does not fail the sync
    if let Err(e) = booking_repo::set_order_id(pool, booking.id, &order_id).await {
        tracing::error!(
            booking_id = booking.id,
            order_id = %order_id,
            error = %e,
            "Failed to persist provider order id"
        );
    }

    tracing::info!(
        booking_id = booking.id,
        order_id = %order_id,
        seats = seats.len(),
        "Provider order confirmed"
    );

    Ok(())
}

async fn cancel_order_best_effort(ticketing: &Arc<TicketingClient>, order_id: &str) {
    if let Err(e) = ticketing.cancel_order(order_id).await {
        tracing::error!(order_id = %order_id, error = %e, "Provider order cancel failed");
    }
}
