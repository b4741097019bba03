//! Cache error type

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    /// Connection pool error
    #[error("cache pool error: {0}")]
    Pool(String),

    /// Command failed
    #[error("cache command error: {0}")]
    Command(String),

    /// Read exceeded its deadline
    #[error("cache read timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Configuration error
    #[error("cache configuration error: {0}")]
    Config(String),
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(e: deadpool_redis::PoolError) -> Self {
        CacheError::Pool(e.to_string())
    }
}

impl From<deadpool_redis::redis::RedisError> for CacheError {
    fn from(e: deadpool_redis::redis::RedisError) -> Self {
        CacheError::Command(e.to_string())
    }
}
