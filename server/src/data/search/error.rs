//! Search error type

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    /// Transport-level failure
    #[error("search transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The index answered with an error status
    #[error("search index error: status {status}: {body}")]
    Index { status: u16, body: String },

    /// Response body did not match the expected shape
    #[error("search response decode error: {0}")]
    Decode(String),

    /// Retries exhausted
    #[error("search unavailable after {attempts} attempts: {last_error}")]
    Unavailable { attempts: u32, last_error: String },
}
