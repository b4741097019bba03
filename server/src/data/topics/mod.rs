//! Stream topics: the bus behind the booking workflow.
//!
//! At-least-once pub/sub with durable queue groups. Payloads are JSON, one
//! subject per stream. Subscribers must be idempotent: a message may be
//! delivered twice (consumer crash before ack, claim after the ack-wait) and
//! subjects carry no ordering guarantees relative to each other.

mod backend;
mod error;
mod memory;
mod redis;

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use backend::{StreamMessage, StreamStats, StreamSubscription, TopicBackend};
pub use error::TopicError;
pub use memory::MemoryTopicBackend;

use crate::core::config::{CacheBackendType, CacheConfig};

/// Central topic service.
///
/// Topics follow the cache backend configuration: the memory backend is for
/// tests and single-process development, Valkey streams for production.
pub struct TopicService {
    backend: Arc<dyn TopicBackend>,
}

impl TopicService {
    /// Create with the in-memory backend
    pub fn new() -> Self {
        Self {
            backend: Arc::new(MemoryTopicBackend::new()),
        }
    }

    /// Create from cache configuration
    pub async fn from_cache_config(config: &CacheConfig) -> Result<Self, TopicError> {
        let backend: Arc<dyn TopicBackend> = match config.backend {
            CacheBackendType::Memory => Arc::new(MemoryTopicBackend::new()),
            CacheBackendType::Valkey => {
                Arc::new(redis::ValkeyTopicBackend::new(&config.url()).await?)
            }
        };

        Ok(Self { backend })
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Typed handle for a subject
    pub fn stream_topic<T>(&self, name: &str) -> StreamTopic<T>
    where
        T: Serialize + DeserializeOwned + Send,
    {
        StreamTopic {
            name: name.to_string(),
            backend: Arc::clone(&self.backend),
            _phantom: PhantomData,
        }
    }

    pub async fn stream_stats(&self, topic: &str, group: &str) -> Result<StreamStats, TopicError> {
        self.backend.stream_stats(topic, group).await
    }

    pub async fn health_check(&self) -> Result<(), TopicError> {
        self.backend.health_check().await
    }
}

impl Default for TopicService {
    fn default() -> Self {
        Self::new()
    }
}

/// Typed stream topic handle
pub struct StreamTopic<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    name: String,
    backend: Arc<dyn TopicBackend>,
    _phantom: PhantomData<T>,
}

impl<T> StreamTopic<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    /// Publish a message, returning its id
    pub async fn publish(&self, msg: &T) -> Result<String, TopicError> {
        let payload =
            serde_json::to_vec(msg).map_err(|e| TopicError::Serialization(e.to_string()))?;
        self.backend.stream_publish(&self.name, &payload).await
    }

    /// Subscribe within a consumer group. Call `acker().ack(id)` after the
    /// side effects of each message succeed.
    pub async fn subscribe(
        &self,
        group: &str,
        consumer: &str,
    ) -> Result<StreamTopicSubscriber<T>, TopicError> {
        let subscription = self
            .backend
            .stream_subscribe(&self.name, group, consumer)
            .await?;
        Ok(StreamTopicSubscriber {
            name: self.name.clone(),
            group: group.to_string(),
            backend: Arc::clone(&self.backend),
            subscription,
            _phantom: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Acker handle, detachable from the subscriber (Send + Sync)
#[derive(Clone)]
pub struct StreamAcker {
    name: String,
    group: String,
    backend: Arc<dyn TopicBackend>,
}

impl StreamAcker {
    pub async fn ack(&self, id: &str) -> Result<(), TopicError> {
        self.backend.stream_ack(&self.name, &self.group, id).await
    }
}

/// Subscriber to a typed stream topic
pub struct StreamTopicSubscriber<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    name: String,
    group: String,
    backend: Arc<dyn TopicBackend>,
    subscription: StreamSubscription,
    _phantom: PhantomData<T>,
}

impl<T> StreamTopicSubscriber<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    /// Receive the next message as `(id, message)`.
    ///
    /// A payload that fails to decode is surfaced as an error with its id so
    /// the caller can ack it away instead of poisoning redelivery forever.
    pub async fn recv(&mut self) -> Result<(String, T), (Option<String>, TopicError)> {
        match self.subscription.receiver.next().await {
            Some(Ok(msg)) => match serde_json::from_slice(&msg.payload) {
                Ok(decoded) => Ok((msg.id, decoded)),
                Err(e) => Err((
                    Some(msg.id),
                    TopicError::Serialization(e.to_string()),
                )),
            },
            Some(Err(e)) => Err((None, e)),
            None => Err((None, TopicError::ChannelClosed)),
        }
    }

    /// Claim messages stuck past `min_idle_ms` (another consumer died)
    pub fn claim(
        &self,
        consumer: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> impl Future<Output = Result<Vec<(String, T)>, TopicError>> + Send + 'static {
        // Clone what's needed up front and hand off to a free function that
        // doesn't borrow `self`: the receiver stream inside `self` isn't
        // `Sync`, so a reference to `self` can't be part of a future that
        // must be `Send` (as this one is, via `tokio::spawn`).
        let backend = Arc::clone(&self.backend);
        let name = self.name.clone();
        let group = self.group.clone();
        let consumer = consumer.to_string();

        async move {
            let messages = backend
                .stream_claim(&name, &group, &consumer, min_idle_ms, count)
                .await?;

            let mut result = Vec::new();
            for msg in messages {
                match serde_json::from_slice(&msg.payload) {
                    Ok(decoded) => result.push((msg.id, decoded)),
                    Err(e) => {
                        tracing::warn!(
                            topic = %name,
                            id = %msg.id,
                            error = %e,
                            "Dropping undecodable claimed message"
                        );
                        let _ = backend.stream_ack(&name, &group, &msg.id).await;
                    }
                }
            }
            Ok(result)
        }
    }

    pub fn acker(&self) -> StreamAcker {
        StreamAcker {
            name: self.name.clone(),
            group: self.group.clone(),
            backend: Arc::clone(&self.backend),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestEvent {
        booking_id: i64,
        note: String,
    }

    #[tokio::test]
    async fn typed_publish_and_receive() {
        let service = TopicService::new();
        let topic = service.stream_topic::<TestEvent>("test.subject");

        let sent = TestEvent {
            booking_id: 7,
            note: "hi".into(),
        };
        topic.publish(&sent).await.unwrap();

        let mut sub = topic.subscribe("g", "c1").await.unwrap();
        let (id, received) = sub.recv().await.unwrap();
        assert_eq!(received, sent);
        sub.acker().ack(&id).await.unwrap();

        let stats = service.stream_stats("test.subject", "g").await.unwrap();
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn redelivery_after_missing_ack() {
        let service = TopicService::new();
        let topic = service.stream_topic::<TestEvent>("test.redelivery");

        topic
            .publish(&TestEvent {
                booking_id: 1,
                note: "n".into(),
            })
            .await
            .unwrap();

        let mut sub = topic.subscribe("g", "c1").await.unwrap();
        let (id, _) = sub.recv().await.unwrap();
        // No ack: message stays pending and is claimable by another member
        let claimed = sub.claim("c2", 0, 8).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].0, id);
    }

    #[tokio::test]
    async fn undecodable_payload_reports_id_for_ack() {
        let service = TopicService::new();
        let raw = service.stream_topic::<serde_json::Value>("test.bad");
        // Publish JSON that does not match TestEvent
        raw.publish(&serde_json::json!({"unexpected": true}))
            .await
            .unwrap();

        let typed = service.stream_topic::<TestEvent>("test.bad");
        let mut sub = typed.subscribe("g", "c1").await.unwrap();
        let err = sub.recv().await.unwrap_err();
        assert!(err.0.is_some());
    }
}
