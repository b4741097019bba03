//! In-memory topic backend.
//!
//! Simulates consumer-group streams inside one process: a VecDeque per
//! topic, per-group delivery cursors and a pending table for unacked
//! messages. Suitable for tests and single-node development; a crash loses
//! everything, which is exactly why production uses the Valkey backend.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use async_stream::stream;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::backend::{StreamMessage, StreamStats, StreamSubscription, TopicBackend};
use super::error::TopicError;

const DEFAULT_STREAM_MAX_LEN: usize = 100_000;

#[derive(Clone)]
struct StreamEntry {
    id: u64,
    payload: Vec<u8>,
}

#[derive(Default)]
struct ConsumerGroup {
    /// Highest id handed out to any consumer of this group
    last_delivered: u64,
    /// Unacked messages: id -> (consumer, delivery time)
    pending: HashMap<u64, (String, Instant)>,
}

#[derive(Default)]
struct StreamState {
    messages: VecDeque<StreamEntry>,
    groups: HashMap<String, ConsumerGroup>,
    next_id: u64,
}

struct Shared {
    streams: Mutex<HashMap<String, StreamState>>,
    notifiers: Mutex<HashMap<String, Arc<Notify>>>,
}

pub struct MemoryTopicBackend {
    shared: Arc<Shared>,
}

impl MemoryTopicBackend {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                streams: Mutex::new(HashMap::new()),
                notifiers: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn notifier(shared: &Shared, topic: &str) -> Arc<Notify> {
        shared
            .notifiers
            .lock()
            .entry(topic.to_string())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    /// Pop the next undelivered message for a group, marking it pending
    fn next_for_group(
        shared: &Shared,
        topic: &str,
        group: &str,
        consumer: &str,
    ) -> Option<StreamMessage> {
        let mut streams = shared.streams.lock();
        let state = streams.entry(topic.to_string()).or_default();
        let group_state = state.groups.entry(group.to_string()).or_default();

        let entry = state
            .messages
            .iter()
            .find(|m| m.id > group_state.last_delivered)?
            .clone();

        group_state.last_delivered = entry.id;
        group_state
            .pending
            .insert(entry.id, (consumer.to_string(), Instant::now()));

        Some(StreamMessage {
            id: entry.id.to_string(),
            payload: entry.payload,
        })
    }
}

impl Default for MemoryTopicBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TopicBackend for MemoryTopicBackend {
    async fn stream_publish(&self, topic: &str, payload: &[u8]) -> Result<String, TopicError> {
        let id = {
            let mut streams = self.shared.streams.lock();
            let state = streams.entry(topic.to_string()).or_default();

            state.next_id += 1;
            let id = state.next_id;
            state.messages.push_back(StreamEntry {
                id,
                payload: payload.to_vec(),
            });
            while state.messages.len() > DEFAULT_STREAM_MAX_LEN {
                state.messages.pop_front();
            }
            id
        };

        Self::notifier(&self.shared, topic).notify_waiters();
        Ok(id.to_string())
    }

    async fn stream_subscribe(
        &self,
        topic: &str,
        group: &str,
        consumer: &str,
    ) -> Result<StreamSubscription, TopicError> {
        let shared = Arc::clone(&self.shared);
        let topic = topic.to_string();
        let group = group.to_string();
        let consumer = consumer.to_string();

        let stream = stream! {
            loop {
                let notify = MemoryTopicBackend::notifier(&shared, &topic);
                // Register interest before checking state so a publish
                // between the check and the await cannot be missed
                let mut notified = Box::pin(notify.notified());
                notified.as_mut().enable();

                if let Some(msg) =
                    MemoryTopicBackend::next_for_group(&shared, &topic, &group, &consumer)
                {
                    yield Ok(msg);
                    continue;
                }

                notified.await;
            }
        };

        Ok(StreamSubscription {
            receiver: Box::pin(stream),
        })
    }

    async fn stream_ack(&self, topic: &str, group: &str, id: &str) -> Result<(), TopicError> {
        let id: u64 = id
            .parse()
            .map_err(|_| TopicError::Serialization(format!("invalid message id: {id}")))?;

        let mut streams = self.shared.streams.lock();
        if let Some(state) = streams.get_mut(topic)
            && let Some(group_state) = state.groups.get_mut(group)
        {
            group_state.pending.remove(&id);
        }
        Ok(())
    }

    async fn stream_claim(
        &self,
        topic: &str,
        group: &str,
        consumer: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> Result<Vec<StreamMessage>, TopicError> {
        let mut streams = self.shared.streams.lock();
        let Some(state) = streams.get_mut(topic) else {
            return Ok(vec![]);
        };
        let Some(group_state) = state.groups.get_mut(group) else {
            return Ok(vec![]);
        };

        let now = Instant::now();
        let mut claimable: Vec<u64> = group_state
            .pending
            .iter()
            .filter(|(_, (_, delivered))| {
                now.duration_since(*delivered).as_millis() as u64 >= min_idle_ms
            })
            .map(|(id, _)| *id)
            .collect();
        claimable.sort_unstable();
        claimable.truncate(count);

        let mut messages = Vec::new();
        for id in claimable {
            group_state
                .pending
                .insert(id, (consumer.to_string(), now));
            if let Some(entry) = state.messages.iter().find(|m| m.id == id) {
                messages.push(StreamMessage {
                    id: id.to_string(),
                    payload: entry.payload.clone(),
                });
            }
        }

        Ok(messages)
    }

    async fn stream_stats(&self, topic: &str, group: &str) -> Result<StreamStats, TopicError> {
        let streams = self.shared.streams.lock();
        let Some(state) = streams.get(topic) else {
            return Ok(StreamStats::default());
        };

        Ok(StreamStats {
            length: state.messages.len() as u64,
            pending: state
                .groups
                .get(group)
                .map(|g| g.pending.len() as u64)
                .unwrap_or(0),
        })
    }

    async fn health_check(&self) -> Result<(), TopicError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn publish_then_subscribe_delivers() {
        let backend = MemoryTopicBackend::new();
        backend.stream_publish("t", b"one").await.unwrap();

        let mut sub = backend.stream_subscribe("t", "g", "c1").await.unwrap();
        let msg = sub.receiver.next().await.unwrap().unwrap();
        assert_eq!(msg.payload, b"one");
    }

    #[tokio::test]
    async fn group_members_split_messages() {
        let backend = MemoryTopicBackend::new();
        backend.stream_publish("t", b"a").await.unwrap();
        backend.stream_publish("t", b"b").await.unwrap();

        let mut sub1 = backend.stream_subscribe("t", "g", "c1").await.unwrap();
        let mut sub2 = backend.stream_subscribe("t", "g", "c2").await.unwrap();

        let m1 = sub1.receiver.next().await.unwrap().unwrap();
        let m2 = sub2.receiver.next().await.unwrap().unwrap();
        assert_ne!(m1.id, m2.id);
    }

    #[tokio::test]
    async fn unacked_message_is_claimable() {
        let backend = MemoryTopicBackend::new();
        backend.stream_publish("t", b"x").await.unwrap();

        let mut sub = backend.stream_subscribe("t", "g", "c1").await.unwrap();
        let msg = sub.receiver.next().await.unwrap().unwrap();
        drop(sub);

        tokio::time::sleep(Duration::from_millis(20)).await;

        let claimed = backend.stream_claim("t", "g", "c2", 10, 8).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].id, msg.id);
        assert_eq!(claimed[0].payload, b"x");
    }

    #[tokio::test]
    async fn acked_message_is_not_claimable() {
        let backend = MemoryTopicBackend::new();
        backend.stream_publish("t", b"x").await.unwrap();

        let mut sub = backend.stream_subscribe("t", "g", "c1").await.unwrap();
        let msg = sub.receiver.next().await.unwrap().unwrap();
        backend.stream_ack("t", "g", &msg.id).await.unwrap();

        let claimed = backend.stream_claim("t", "g", "c2", 0, 8).await.unwrap();
        assert!(claimed.is_empty());

        let stats = backend.stream_stats("t", "g").await.unwrap();
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn independent_groups_both_see_every_message() {
        let backend = MemoryTopicBackend::new();
        backend.stream_publish("t", b"x").await.unwrap();

        let mut a = backend.stream_subscribe("t", "workers", "c1").await.unwrap();
        let mut b = backend.stream_subscribe("t", "audit", "c1").await.unwrap();

        assert_eq!(a.receiver.next().await.unwrap().unwrap().payload, b"x");
        assert_eq!(b.receiver.next().await.unwrap().unwrap().payload, b"x");
    }
}
