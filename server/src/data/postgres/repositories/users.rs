//! User repository.
//!
//! Users are provisioned out-of-band; the service only reads them for
//! authentication.

use sqlx::PgPool;

use crate::data::postgres::StoreError;
use crate::data::types::UserRow;

/// Get an active-or-not user by email
pub async fn get_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, StoreError> {
    let user = sqlx::query_as::<_, UserRow>(
        "SELECT user_id, email, password_hash, password_plain, first_name, surname,
                birthday, registered_at, is_active, last_logged_in
         FROM users
         WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}
