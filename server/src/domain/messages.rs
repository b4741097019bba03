//! Bus subjects and payloads.
//!
//! Payloads are JSON, versioned implicitly by subject. Consumers must
//! tolerate duplicates and reorder; every field a consumer needs to act
//! idempotently rides in the message itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::topics::TopicService;

pub mod subjects {
    pub const BOOKING_CREATED: &str = "booking.created";
    pub const PAYMENT_INITIATED: &str = "payment.initiated";
    pub const PAYMENT_COMPLETED: &str = "payment.completed";
    pub const PAYMENT_FAILED: &str = "payment.failed";
    pub const SEAT_SELECTED: &str = "seat.selected";
    pub const SEAT_RELEASED: &str = "seat.released";
    pub const BOOKING_CANCELLED: &str = "booking.cancelled";
    pub const BOOKING_EXPIRED: &str = "booking.expired";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCreated {
    pub booking_id: i64,
    pub event_id: i64,
    pub user_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInitiated {
    pub booking_id: i64,
    pub event_id: i64,
    pub total_amount: i64,
    pub payment_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCompleted {
    pub booking_id: i64,
    pub payment_id: String,
    #[serde(default)]
    pub order_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFailed {
    pub booking_id: i64,
    pub payment_id: String,
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatSelected {
    pub booking_id: i64,
    pub seat_id: String,
    pub event_id: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatReleased {
    pub booking_id: i64,
    pub seat_id: String,
    pub event_id: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCancelled {
    pub booking_id: i64,
    pub event_id: i64,
    #[serde(default)]
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingExpired {
    pub booking_id: i64,
    pub event_id: i64,
    pub user_id: Option<i64>,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

/// Publish after a successful store write.
///
/// The write is the source of truth; a publish failure is logged and
/// swallowed, and the expirer or workflow reconciles later.
pub async fn publish_logged<T>(topics: &TopicService, subject: &str, payload: &T)
where
    T: Serialize + serde::de::DeserializeOwned + Send + Sync,
{
    let topic = topics.stream_topic::<T>(subject);
    if let Err(e) = topic.publish(payload).await {
        tracing::error!(subject = %subject, error = %e, "Failed to publish bus message");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_completed_round_trips_as_json() {
        let msg = PaymentCompleted {
            booking_id: 12,
            payment_id: "pay-1".into(),
            order_id: "ord-1".into(),
            timestamp: Utc::now(),
        };
        let bytes = serde_json::to_vec(&msg).unwrap();
        let back: PaymentCompleted = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.booking_id, 12);
        assert_eq!(back.payment_id, "pay-1");
    }

    #[test]
    fn optional_fields_default_when_absent() {
        let back: PaymentFailed = serde_json::from_str(
            r#"{"booking_id":1,"payment_id":"p","timestamp":"2026-08-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(back.order_id, "");
        assert_eq!(back.reason, "");
    }
}
