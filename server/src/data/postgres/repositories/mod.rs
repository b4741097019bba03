//! Store repositories.
//!
//! Free async functions over the shared pool, one module per aggregate.
//! Every mutation runs inside a single transaction; seat mutations take a
//! row-level lock so concurrent reservations serialize per seat.

pub mod bookings;
pub mod events;
pub mod seats;
pub mod users;

use sqlx::PgPool;

use super::error::StoreError;

/// Administrative purge: drop every booking link and booking, then return
/// the whole seat inventory to FREE. One transaction; callers must treat a
/// failure as retryable.
pub async fn reset_all(pool: &PgPool) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM booking_seats")
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM bookings").execute(&mut *tx).await?;
    sqlx::query("UPDATE seats SET status = 'FREE', updated_at = NOW() WHERE status <> 'FREE'")
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}
