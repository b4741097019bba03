//! Row types and status state machines.
//!
//! Status columns are stored as text and validated by CHECK constraints; the
//! enums here are the in-process view of those columns. Transitions that the
//! workflow applies are expressed as CAS-style guards (`UPDATE ... WHERE
//! status = ...`) in the repositories, so duplicate bus deliveries cannot
//! move a row twice.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// =============================================================================
// Status enums
// =============================================================================

/// Seat lifecycle: FREE ⇄ RESERVED → SOLD (until reset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SeatStatus {
    Free,
    Reserved,
    Sold,
}

impl SeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Free => "FREE",
            SeatStatus::Reserved => "RESERVED",
            SeatStatus::Sold => "SOLD",
        }
    }
}

impl FromStr for SeatStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FREE" => Ok(SeatStatus::Free),
            "RESERVED" => Ok(SeatStatus::Reserved),
            "SOLD" => Ok(SeatStatus::Sold),
            other => Err(format!("unknown seat status: {other}")),
        }
    }
}

impl fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Booking lifecycle: CREATED → CONFIRMED | CANCELLED | EXPIRED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Created,
    Confirmed,
    Cancelled,
    Expired,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Created => "CREATED",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Expired => "EXPIRED",
        }
    }

    /// A terminal booking no longer holds seats
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Expired)
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(BookingStatus::Created),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            "EXPIRED" => Ok(BookingStatus::Expired),
            other => Err(format!("unknown booking status: {other}")),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment lifecycle: PENDING → INITIATED → COMPLETED | FAILED | CANCELLED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Initiated,
    Completed,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Initiated => "INITIATED",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "INITIATED" => Ok(PaymentStatus::Initiated),
            "COMPLETED" => Ok(PaymentStatus::Completed),
            "FAILED" => Ok(PaymentStatus::Failed),
            "CANCELLED" => Ok(PaymentStatus::Cancelled),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome reported by the payment gateway.
///
/// The gateway vocabulary is wider than ours; everything it can say collapses
/// into these two symbols before it reaches the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Completed,
    Failed,
}

impl PaymentOutcome {
    /// Translate a provider status into a local outcome.
    ///
    /// Returns `None` for intermediate statuses the workflow ignores.
    pub fn from_provider_status(status: &str) -> Option<Self> {
        match status {
            "completed" | "CONFIRMED" => Some(PaymentOutcome::Completed),
            "failed" | "REJECTED" | "CANCELLED" => Some(PaymentOutcome::Failed),
            _ => None,
        }
    }
}

// =============================================================================
// Rows
// =============================================================================

/// User row. Provisioned out-of-band; read-only for this service.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub user_id: i64,
    pub email: String,
    pub password_hash: String,
    pub password_plain: Option<String>,
    pub first_name: String,
    pub surname: String,
    pub birthday: Option<NaiveDate>,
    pub registered_at: DateTime<Utc>,
    pub is_active: bool,
    pub last_logged_in: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub event_type: String,
    pub datetime_start: DateTime<Utc>,
    pub provider: String,
    pub external: bool,
    pub total_seats: i32,
}

/// Seat row. The id is an opaque string: a UUID for locally-owned events,
/// the provider's place id for the external event.
#[derive(Debug, Clone, FromRow)]
pub struct SeatRow {
    pub id: String,
    pub event_id: i64,
    #[sqlx(rename = "row_number")]
    pub row: i32,
    #[sqlx(rename = "seat_number")]
    pub number: i32,
    pub status: String,
    pub price: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SeatRow {
    pub fn status(&self) -> Result<SeatStatus, String> {
        self.status.parse()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct BookingRow {
    pub id: i64,
    pub event_id: i64,
    pub user_id: Option<i64>,
    pub status: String,
    pub payment_status: String,
    pub total_amount: Option<String>,
    pub payment_id: Option<String>,
    pub order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingRow {
    pub fn status(&self) -> Result<BookingStatus, String> {
        self.status.parse()
    }

    pub fn payment_status(&self) -> Result<PaymentStatus, String> {
        self.payment_status.parse()
    }

    /// Whether the authenticated user owns this booking
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == Some(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_status_round_trips() {
        for s in [SeatStatus::Free, SeatStatus::Reserved, SeatStatus::Sold] {
            assert_eq!(s.as_str().parse::<SeatStatus>().unwrap(), s);
        }
        assert!("TAKEN".parse::<SeatStatus>().is_err());
    }

    #[test]
    fn terminal_bookings_hold_no_seats() {
        assert!(!BookingStatus::Created.is_terminal());
        assert!(!BookingStatus::Confirmed.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
        assert!(BookingStatus::Expired.is_terminal());
    }

    #[test]
    fn provider_statuses_collapse_to_outcomes() {
        assert_eq!(
            PaymentOutcome::from_provider_status("completed"),
            Some(PaymentOutcome::Completed)
        );
        assert_eq!(
            PaymentOutcome::from_provider_status("CONFIRMED"),
            Some(PaymentOutcome::Completed)
        );
        for s in ["failed", "REJECTED", "CANCELLED"] {
            assert_eq!(
                PaymentOutcome::from_provider_status(s),
                Some(PaymentOutcome::Failed)
            );
        }
        assert_eq!(PaymentOutcome::from_provider_status("NEW"), None);
        assert_eq!(PaymentOutcome::from_provider_status("AUTHORIZED"), None);
    }

    #[test]
    fn booking_ownership_requires_matching_user() {
        let booking = BookingRow {
            id: 7,
            event_id: 2,
            user_id: Some(42),
            status: "CREATED".into(),
            payment_status: "PENDING".into(),
            total_amount: Some("0".into()),
            payment_id: None,
            order_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(booking.is_owned_by(42));
        assert!(!booking.is_owned_by(41));
    }
}
