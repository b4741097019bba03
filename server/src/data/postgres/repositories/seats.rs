//! Seat repository.
//!
//! Reservation is the contention point of the whole system: `reserve` takes
//! a `FOR UPDATE` row lock so concurrent requests for the same seat
//! serialize, and exactly one of them observes FREE.

use rand::Rng;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::data::postgres::StoreError;
use crate::data::types::{SeatRow, SeatStatus};

const SEAT_COLUMNS: &str =
    "id, event_id, row_number, seat_number, status, price, created_at, updated_at";

/// Create the seat grid for a locally-owned event.
///
/// Seat ids are fresh UUIDs; prices are randomized kopeck amounts in the
/// 1000..10000 range, matching the provisioning tool. Also bumps the event's
/// `total_seats`, all in one transaction.
pub async fn create_for_event(
    pool: &PgPool,
    event_id: i64,
    rows: i32,
    seats_per_row: i32,
) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;

    let prices: Vec<i64> = {
        let mut rng = rand::thread_rng();
        (0..(rows * seats_per_row))
            .map(|_| rng.gen_range(1000..10000))
            .collect()
    };

    let mut i = 0usize;
    for row in 1..=rows {
        for seat in 1..=seats_per_row {
            sqlx::query(
                "INSERT INTO seats (id, event_id, row_number, seat_number, status, price)
                 VALUES ($1, $2, $3, $4, 'FREE', $5)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(event_id)
            .bind(row)
            .bind(seat)
            .bind(prices[i])
            .execute(&mut *tx)
            .await?;
            i += 1;
        }
    }

    sqlx::query("UPDATE events_archive SET total_seats = $1 WHERE id = $2")
        .bind(rows * seats_per_row)
        .bind(event_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// List seats for an event with optional row/status filters.
///
/// Ordered by (row, number) so pagination is stable.
pub async fn get_by_event(
    pool: &PgPool,
    event_id: i64,
    page: u32,
    page_size: u32,
    row: Option<i32>,
    status: Option<SeatStatus>,
) -> Result<Vec<SeatRow>, StoreError> {
    let mut query: QueryBuilder<'_, Postgres> =
        QueryBuilder::new(format!("SELECT {SEAT_COLUMNS} FROM seats WHERE event_id = "));
    query.push_bind(event_id);

    if let Some(row) = row {
        query.push(" AND row_number = ");
        query.push_bind(row);
    }
    if let Some(status) = status {
        query.push(" AND status = ");
        query.push_bind(status.as_str());
    }

    query.push(" ORDER BY row_number, seat_number");
    query.push(" LIMIT ");
    query.push_bind(page_size as i64);
    query.push(" OFFSET ");
    query.push_bind(((page.saturating_sub(1)) * page_size) as i64);

    let seats = query.build_query_as::<SeatRow>().fetch_all(pool).await?;
    Ok(seats)
}

pub async fn get_by_id(pool: &PgPool, id: &str) -> Result<Option<SeatRow>, StoreError> {
    let seat =
        sqlx::query_as::<_, SeatRow>(&format!("SELECT {SEAT_COLUMNS} FROM seats WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?;

    Ok(seat)
}

/// Reserve a seat for a booking.
///
/// Locks the seat row, verifies it is FREE, flips it to RESERVED and inserts
/// the booking link. The `(booking_id, seat_id)` uniqueness makes a duplicate
/// request a no-op rather than a double link.
pub async fn reserve(pool: &PgPool, seat_id: &str, booking_id: i64) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;

    let current: Option<String> =
        sqlx::query_scalar("SELECT status FROM seats WHERE id = $1 FOR UPDATE")
            .bind(seat_id)
            .fetch_optional(&mut *tx)
            .await?;

    let current = current.ok_or(StoreError::NotFound { entity: "seat" })?;
    if current != SeatStatus::Free.as_str() {
        return Err(StoreError::SeatNotAvailable {
            seat_id: seat_id.to_string(),
        });
    }

    sqlx::query("UPDATE seats SET status = 'RESERVED', updated_at = NOW() WHERE id = $1")
        .bind(seat_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO booking_seats (booking_id, seat_id) VALUES ($1, $2)
         ON CONFLICT (booking_id, seat_id) DO NOTHING",
    )
    .bind(booking_id)
    .bind(seat_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Release a seat back to FREE and drop its booking link.
///
/// Unconditional on the current status: the failed-payment path releases
/// RESERVED seats and the reset/expiry paths may release SOLD ones.
pub async fn release(pool: &PgPool, seat_id: &str) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE seats SET status = 'FREE', updated_at = NOW() WHERE id = $1")
        .bind(seat_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM booking_seats WHERE seat_id = $1")
        .bind(seat_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// RESERVED → SOLD. The status guard makes duplicate payment.completed
/// deliveries idempotent.
pub async fn mark_sold(pool: &PgPool, seat_id: &str) -> Result<(), StoreError> {
    sqlx::query("UPDATE seats SET status = 'SOLD', updated_at = NOW() WHERE id = $1 AND status = 'RESERVED'")
        .bind(seat_id)
        .execute(pool)
        .await?;
    Ok(())
}
