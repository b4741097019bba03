//! Store error type

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Seat was not FREE at reservation time
    #[error("seat {seat_id} is not available")]
    SeatNotAvailable { seat_id: String },

    /// Referenced row does not exist
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// Migration failed
    #[error("migration v{version} ({name}) failed: {error}")]
    MigrationFailed {
        version: i32,
        name: String,
        error: String,
    },

    /// Configuration error
    #[error("store configuration error: {0}")]
    Config(String),

    /// Readiness probe timed out
    #[error("database ping timed out after {timeout_secs}s")]
    PingTimeout { timeout_secs: u64 },
}

impl StoreError {
    /// Whether retrying the operation may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::PingTimeout { .. } => true,
            Self::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed
            ),
            _ => false,
        }
    }
}
