//! Topic backend trait definition.
//!
//! Streams give the bus its delivery contract: at-least-once, durable per
//! consumer group, one member of a group per message, explicit ack after
//! side effects, and redelivery of unacked messages via idle-claim.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use super::error::TopicError;

/// Message received from a stream, with the id needed to ack it
#[derive(Debug, Clone)]
pub struct StreamMessage {
    pub id: String,
    pub payload: Vec<u8>,
}

/// Subscription to a stream topic
pub struct StreamSubscription {
    pub receiver: Pin<Box<dyn Stream<Item = Result<StreamMessage, TopicError>> + Send>>,
}

/// Stream statistics for monitoring
#[derive(Debug, Clone, Default)]
pub struct StreamStats {
    pub length: u64,
    pub pending: u64,
}

#[async_trait]
pub trait TopicBackend: Send + Sync {
    /// Append a message, returning its id
    async fn stream_publish(&self, topic: &str, payload: &[u8]) -> Result<String, TopicError>;

    /// Subscribe as `consumer` within `group`. Messages are load-balanced
    /// across the group's consumers; each message goes to exactly one.
    async fn stream_subscribe(
        &self,
        topic: &str,
        group: &str,
        consumer: &str,
    ) -> Result<StreamSubscription, TopicError>;

    /// Acknowledge successful processing
    async fn stream_ack(&self, topic: &str, group: &str, id: &str) -> Result<(), TopicError>;

    /// Claim messages pending longer than `min_idle_ms` (redelivery of work
    /// whose consumer failed before acking)
    async fn stream_claim(
        &self,
        topic: &str,
        group: &str,
        consumer: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> Result<Vec<StreamMessage>, TopicError>;

    /// Stream length and pending count for a group
    async fn stream_stats(&self, topic: &str, group: &str) -> Result<StreamStats, TopicError>;

    /// Health check
    async fn health_check(&self) -> Result<(), TopicError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}
