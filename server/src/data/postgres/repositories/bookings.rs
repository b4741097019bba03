//! Booking repository.
//!
//! Status moves are CAS-style (`UPDATE ... WHERE status = ...`) wherever the
//! workflow can deliver the same message twice.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::data::postgres::StoreError;
use crate::data::types::{BookingRow, BookingStatus, PaymentStatus, SeatRow};

const BOOKING_COLUMNS: &str = "id, event_id, user_id, status, payment_status, total_amount, \
                               payment_id, order_id, created_at, updated_at";

pub struct NewBooking<'a> {
    pub event_id: i64,
    pub user_id: Option<i64>,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: &'a str,
    pub order_id: Option<&'a str>,
}

/// Insert a booking and return the stored row
pub async fn create(pool: &PgPool, booking: &NewBooking<'_>) -> Result<BookingRow, StoreError> {
    let row = sqlx::query_as::<_, BookingRow>(&format!(
        "INSERT INTO bookings (event_id, user_id, status, payment_status, total_amount, order_id)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {BOOKING_COLUMNS}"
    ))
    .bind(booking.event_id)
    .bind(booking.user_id)
    .bind(booking.status.as_str())
    .bind(booking.payment_status.as_str())
    .bind(booking.total_amount)
    .bind(booking.order_id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn get_by_id(pool: &PgPool, id: i64) -> Result<Option<BookingRow>, StoreError> {
    let row = sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn get_by_payment_id(
    pool: &PgPool,
    payment_id: &str,
) -> Result<Option<BookingRow>, StoreError> {
    let row = sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE payment_id = $1"
    ))
    .bind(payment_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn get_by_order_id(
    pool: &PgPool,
    order_id: &str,
) -> Result<Option<BookingRow>, StoreError> {
    let row = sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE order_id = $1"
    ))
    .bind(order_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Bookings of a user, newest first
pub async fn get_by_user(pool: &PgPool, user_id: i64) -> Result<Vec<BookingRow>, StoreError> {
    let rows = sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Seats linked to a booking, in (row, number) order
pub async fn get_seats(pool: &PgPool, booking_id: i64) -> Result<Vec<SeatRow>, StoreError> {
    let rows = sqlx::query_as::<_, SeatRow>(
        "SELECT s.id, s.event_id, s.row_number, s.seat_number, s.status, s.price,
                s.created_at, s.updated_at
         FROM seats s
         JOIN booking_seats bs ON s.id = bs.seat_id
         WHERE bs.booking_id = $1
         ORDER BY s.row_number, s.seat_number",
    )
    .bind(booking_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// The non-terminal booking currently holding a seat, if any
pub async fn get_active_for_seat(
    pool: &PgPool,
    seat_id: &str,
) -> Result<Option<BookingRow>, StoreError> {
    let row = sqlx::query_as::<_, BookingRow>(
        "SELECT b.id, b.event_id, b.user_id, b.status, b.payment_status, b.total_amount,
                b.payment_id, b.order_id, b.created_at, b.updated_at
         FROM bookings b
         JOIN booking_seats bs ON b.id = bs.booking_id
         WHERE bs.seat_id = $1
           AND b.status IN ('CREATED', 'CONFIRMED')",
    )
    .bind(seat_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Unconditional status write (caller already decided the transition)
pub async fn set_statuses(
    pool: &PgPool,
    id: i64,
    status: BookingStatus,
    payment_status: PaymentStatus,
) -> Result<(), StoreError> {
    sqlx::query(
        "UPDATE bookings SET status = $1, payment_status = $2, updated_at = NOW() WHERE id = $3",
    )
    .bind(status.as_str())
    .bind(payment_status.as_str())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// PENDING → INITIATED, only if still PENDING. Returns whether a row moved.
pub async fn set_payment_initiated(pool: &PgPool, id: i64) -> Result<bool, StoreError> {
    let result = sqlx::query(
        "UPDATE bookings SET payment_status = 'INITIATED', updated_at = NOW()
         WHERE id = $1 AND payment_status = 'PENDING'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Attach the gateway payment to a booking after a successful init
pub async fn set_payment_info(
    pool: &PgPool,
    id: i64,
    payment_id: &str,
    order_id: &str,
    total_amount: &str,
) -> Result<(), StoreError> {
    sqlx::query(
        "UPDATE bookings
         SET payment_status = 'INITIATED', payment_id = $1, order_id = $2,
             total_amount = $3, updated_at = NOW()
         WHERE id = $4",
    )
    .bind(payment_id)
    .bind(order_id)
    .bind(total_amount)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn set_order_id(pool: &PgPool, id: i64, order_id: &str) -> Result<(), StoreError> {
    sqlx::query("UPDATE bookings SET order_id = $1, updated_at = NOW() WHERE id = $2")
        .bind(order_id)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Confirm a booking and its payment. Idempotent by value: re-applying the
/// same write leaves the row unchanged.
pub async fn confirm(pool: &PgPool, id: i64) -> Result<(), StoreError> {
    set_statuses(pool, id, BookingStatus::Confirmed, PaymentStatus::Completed).await
}

/// Confirm and record the computed total in one write (the no-gateway path)
pub async fn confirm_with_total(
    pool: &PgPool,
    id: i64,
    total_amount: &str,
) -> Result<(), StoreError> {
    sqlx::query(
        "UPDATE bookings
         SET status = 'CONFIRMED', payment_status = 'COMPLETED', total_amount = $1,
             updated_at = NOW()
         WHERE id = $2",
    )
    .bind(total_amount)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Bookings past the reservation window: CREATED + PENDING, created before
/// the cutoff, oldest first.
pub async fn get_expired(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<BookingRow>, StoreError> {
    let rows = sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE status = 'CREATED'
           AND payment_status = 'PENDING'
           AND created_at < $1
         ORDER BY created_at ASC"
    ))
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
