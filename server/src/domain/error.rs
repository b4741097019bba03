//! Core error taxonomy.
//!
//! Services return these kinds; the boundary owns the mapping to HTTP
//! statuses. Layer errors are wrapped rather than stringified so the
//! boundary can distinguish "dependency down" from "caller mistake".

use thiserror::Error;

use crate::data::cache::CacheError;
use crate::data::postgres::StoreError;
use crate::data::search::SearchError;
use crate::external::ExternalError;

#[derive(Error, Debug)]
pub enum CoreError {
    /// No or invalid credentials
    #[error("unauthorized")]
    Unauthorized,

    /// Authenticated user is not the booking's owner
    #[error("operation is forbidden for user")]
    Forbidden,

    /// Referenced entity absent
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// Cross-entity invariant violated
    #[error("{0}")]
    Conflict(String),

    /// Seat was not FREE at reservation time
    #[error("seat {seat_id} is not available")]
    SeatNotAvailable { seat_id: String },

    /// Malformed request or out-of-range parameter
    #[error("{0}")]
    Validation(String),

    /// A dependency failed and the operation cannot continue
    #[error("dependency unavailable: {0}")]
    Unavailable(String),

    /// Store failure
    #[error("store error: {0}")]
    Store(StoreError),

    /// Search index failure
    #[error("search error: {0}")]
    Search(SearchError),

    /// External provider failure
    #[error("external provider error: {0}")]
    External(#[from] ExternalError),

    /// Everything else
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::SeatNotAvailable { seat_id } => CoreError::SeatNotAvailable { seat_id },
            StoreError::NotFound { entity } => CoreError::NotFound { entity },
            other => CoreError::Store(other),
        }
    }
}

impl From<SearchError> for CoreError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::Unavailable { .. } => CoreError::Unavailable(e.to_string()),
            other => CoreError::Search(other),
        }
    }
}

impl From<CacheError> for CoreError {
    fn from(e: CacheError) -> Self {
        CoreError::Unavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_seat_taken_becomes_seat_not_available() {
        let e: CoreError = StoreError::SeatNotAvailable {
            seat_id: "s1".into(),
        }
        .into();
        assert!(matches!(e, CoreError::SeatNotAvailable { .. }));
    }

    #[test]
    fn store_not_found_keeps_its_entity() {
        let e: CoreError = StoreError::NotFound { entity: "seat" }.into();
        assert!(matches!(e, CoreError::NotFound { entity: "seat" }));
    }
}
