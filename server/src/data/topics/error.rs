//! Topic error type

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TopicError {
    /// Connection failure
    #[error("topic connection error: {0}")]
    Connection(String),

    /// Consumer group management failure
    #[error("consumer group error: {0}")]
    ConsumerGroup(String),

    /// Payload (de)serialization failure
    #[error("topic serialization error: {0}")]
    Serialization(String),

    /// Subscription stream ended
    #[error("topic channel closed")]
    ChannelClosed,

    /// Configuration error
    #[error("topic configuration error: {0}")]
    Config(String),
}

impl From<deadpool_redis::PoolError> for TopicError {
    fn from(e: deadpool_redis::PoolError) -> Self {
        TopicError::Connection(e.to_string())
    }
}

impl From<deadpool_redis::redis::RedisError> for TopicError {
    fn from(e: deadpool_redis::redis::RedisError) -> Self {
        TopicError::Connection(e.to_string())
    }
}
