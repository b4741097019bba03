//! External provider adapters.
//!
//! Both clients are thin semantic wrappers: a bounded request timeout, no
//! internal retries (compensation and retry policy belong to the caller),
//! and typed errors that distinguish transport failures from provider
//! rejections.

pub mod payment;
pub mod ticketing;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExternalError {
    /// Transport-level failure (connect, timeout, TLS)
    #[error("provider transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Provider answered with an unexpected HTTP status
    #[error("{operation} returned unexpected status {status}")]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
    },

    /// Provider answered 2xx but the body did not decode
    #[error("provider response decode error: {0}")]
    Decode(String),

    /// Provider explicitly rejected the operation
    #[error("{operation} rejected by provider")]
    Rejected { operation: &'static str },
}
