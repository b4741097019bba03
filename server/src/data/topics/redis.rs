//! Valkey topic backend using Redis Streams.
//!
//! One stream per subject:
//! - `XADD` publishes (with approximate MAXLEN trimming)
//! - `XREADGROUP ... COUNT 1` consumes within a consumer group, so each
//!   message is processed by exactly one group member and at most one
//!   message is in flight per consumer
//! - `XACK` acknowledges after side effects
//! - `XPENDING`/`XCLAIM` redeliver messages whose consumer died mid-flight

use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use deadpool_redis::redis::{RedisResult, Value as RedisValue};
use deadpool_redis::{Config, Pool, Runtime};

use super::backend::{StreamMessage, StreamStats, StreamSubscription, TopicBackend};
use super::error::TopicError;

/// Stream key prefix (hash tag for cluster compatibility)
const STREAM_PREFIX: &str = "{kassa}:stream:";

/// Approximate MAXLEN for stream trimming
const STREAM_MAXLEN: u64 = 100_000;

/// XREADGROUP block timeout in milliseconds
const XREADGROUP_BLOCK_MS: u64 = 5000;

pub struct ValkeyTopicBackend {
    pool: Pool,
}

impl ValkeyTopicBackend {
    pub async fn new(url: &str) -> Result<Self, TopicError> {
        let mut config = Config::from_url(url);
        config.pool = Some(deadpool_redis::PoolConfig {
            max_size: 32,
            timeouts: deadpool_redis::Timeouts {
                wait: Some(Duration::from_secs(5)),
                create: Some(Duration::from_secs(5)),
                recycle: Some(Duration::from_secs(5)),
            },
            ..Default::default()
        });

        let pool = config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| TopicError::Connection(format!("failed to create topic pool: {e}")))?;

        let mut conn = pool.get().await?;
        deadpool_redis::redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await?;

        tracing::debug!("Valkey topic backend connected");
        Ok(Self { pool })
    }

    fn stream_key(topic: &str) -> String {
        format!("{}{}", STREAM_PREFIX, topic)
    }

    /// Create the consumer group if it does not exist yet.
    ///
    /// Starts at id 0 so messages published before the first consumer came
    /// up are still delivered.
    async fn ensure_consumer_group(&self, topic: &str, group: &str) -> Result<(), TopicError> {
        let key = Self::stream_key(topic);
        let mut conn = self.pool.get().await?;

        let result: RedisResult<String> = deadpool_redis::redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&key)
            .arg(group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
            Err(e) => Err(TopicError::ConsumerGroup(format!(
                "failed to create consumer group {group}: {e}"
            ))),
        }
    }
}

#[async_trait]
impl TopicBackend for ValkeyTopicBackend {
    async fn stream_publish(&self, topic: &str, payload: &[u8]) -> Result<String, TopicError> {
        let key = Self::stream_key(topic);
        let mut conn = self.pool.get().await?;

        let id: String = deadpool_redis::redis::cmd("XADD")
            .arg(&key)
            .arg("MAXLEN")
            .arg("~")
            .arg(STREAM_MAXLEN)
            .arg("*")
            .arg("payload")
            .arg(payload)
            .query_async(&mut conn)
            .await?;

        Ok(id)
    }

    async fn stream_subscribe(
        &self,
        topic: &str,
        group: &str,
        consumer: &str,
    ) -> Result<StreamSubscription, TopicError> {
        self.ensure_consumer_group(topic, group).await?;

        let key = Self::stream_key(topic);
        let group = group.to_string();
        let consumer = consumer.to_string();
        let pool = self.pool.clone();

        let stream = stream! {
            loop {
                let mut conn = match pool.get().await {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to get topic connection, retrying");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        continue;
                    }
                };

                // COUNT 1: one message in flight per consumer
                let result: RedisResult<RedisValue> = deadpool_redis::redis::cmd("XREADGROUP")
                    .arg("GROUP")
                    .arg(&group)
                    .arg(&consumer)
                    .arg("BLOCK")
                    .arg(XREADGROUP_BLOCK_MS)
                    .arg("COUNT")
                    .arg(1)
                    .arg("STREAMS")
                    .arg(&key)
                    .arg(">")
                    .query_async(&mut conn)
                    .await;

                match result {
                    Ok(RedisValue::Nil) => continue,
                    Ok(value) => {
                        if let Some(messages) = parse_xreadgroup_response(value) {
                            for msg in messages {
                                yield Ok(msg);
                            }
                        }
                    }
                    Err(e) => {
                        if e.to_string().contains("NOGROUP") {
                            // Stream key was recreated; restore the group
                            tracing::warn!(stream = %key, "Consumer group lost, recreating");
                            if let Ok(mut conn) = pool.get().await {
                                let _: RedisResult<String> = deadpool_redis::redis::cmd("XGROUP")
                                    .arg("CREATE")
                                    .arg(&key)
                                    .arg(&group)
                                    .arg("0")
                                    .arg("MKSTREAM")
                                    .query_async(&mut conn)
                                    .await;
                            }
                            tokio::time::sleep(Duration::from_millis(100)).await;
                        } else {
                            tracing::warn!(error = %e, "XREADGROUP error, retrying");
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                    }
                }
            }
        };

        Ok(StreamSubscription {
            receiver: Box::pin(stream),
        })
    }

    async fn stream_ack(&self, topic: &str, group: &str, id: &str) -> Result<(), TopicError> {
        let key = Self::stream_key(topic);
        let mut conn = self.pool.get().await?;

        let _: i64 = deadpool_redis::redis::cmd("XACK")
            .arg(&key)
            .arg(group)
            .arg(id)
            .query_async(&mut conn)
            .await?;

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
        let key = Self::stream_key(topic);
        let mut conn = self.pool.get().await?;

        let pending: RedisValue = deadpool_redis::redis::cmd("XPENDING")
            .arg(&key)
            .arg(group)
            .arg("-")
            .arg("+")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        // Entries are [id, consumer, idle_time_ms, delivery_count]
        let mut ids_to_claim: Vec<String> = Vec::new();
        if let RedisValue::Array(entries) = pending {
            for entry in entries {
                if let RedisValue::Array(parts) = entry
                    && parts.len() >= 3
                    && let (RedisValue::BulkString(id_bytes), _, RedisValue::Int(idle)) =
                        (&parts[0], &parts[1], &parts[2])
                    && *idle as u64 >= min_idle_ms
                    && let Ok(id) = String::from_utf8(id_bytes.clone())
                {
                    ids_to_claim.push(id);
                }
            }
        }

        if ids_to_claim.is_empty() {
            return Ok(vec![]);
        }

        let mut cmd = deadpool_redis::redis::cmd("XCLAIM");
        cmd.arg(&key).arg(group).arg(consumer).arg(min_idle_ms);
        for id in &ids_to_claim {
            cmd.arg(id);
        }

        let claimed: RedisValue = cmd.query_async(&mut conn).await?;

        let mut messages = Vec::new();
        if let RedisValue::Array(entries) = claimed {
            for entry in entries {
                if let RedisValue::Array(parts) = entry
                    && parts.len() >= 2
                    && let (RedisValue::BulkString(id_bytes), RedisValue::Array(fields)) =
                        (&parts[0], &parts[1])
                    && let Ok(id) = String::from_utf8(id_bytes.clone())
                    && let Some(payload) = extract_payload_from_fields(fields)
                {
                    messages.push(StreamMessage { id, payload });
                }
            }
        }

        Ok(messages)
    }

    async fn stream_stats(&self, topic: &str, group: &str) -> Result<StreamStats, TopicError> {
        let key = Self::stream_key(topic);
        let mut conn = self.pool.get().await?;

        let length: u64 = deadpool_redis::redis::cmd("XLEN")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .unwrap_or(0);

        let pending_info: RedisValue = deadpool_redis::redis::cmd("XPENDING")
            .arg(&key)
            .arg(group)
            .query_async(&mut conn)
            .await
            .unwrap_or(RedisValue::Nil);

        let mut pending = 0u64;
        if let RedisValue::Array(parts) = pending_info
            && let Some(RedisValue::Int(p)) = parts.first()
        {
            pending = *p as u64;
        }

        Ok(StreamStats { length, pending })
    }

    async fn health_check(&self) -> Result<(), TopicError> {
        let mut conn = self.pool.get().await?;
        deadpool_redis::redis::cmd("PING")
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "valkey"
    }
}

/// Parse `[[stream_name, [[id, [field, value, ...]], ...]]]`
fn parse_xreadgroup_response(value: RedisValue) -> Option<Vec<StreamMessage>> {
    let streams = match value {
        RedisValue::Array(arr) => arr,
        _ => return None,
    };

    let mut messages = Vec::new();
    for stream_data in streams {
        let RedisValue::Array(parts) = stream_data else {
            continue;
        };
        if parts.len() < 2 {
            continue;
        }
        let RedisValue::Array(msg_list) = &parts[1] else {
            continue;
        };
        for msg in msg_list {
            if let RedisValue::Array(msg_parts) = msg
                && msg_parts.len() >= 2
                && let (RedisValue::BulkString(id_bytes), RedisValue::Array(fields)) =
                    (&msg_parts[0], &msg_parts[1])
                && let Ok(id) = String::from_utf8(id_bytes.clone())
                && let Some(payload) = extract_payload_from_fields(fields)
            {
                messages.push(StreamMessage { id, payload });
            }
        }
    }

    if messages.is_empty() {
        None
    } else {
        Some(messages)
    }
}

/// Fields arrive as `[field1, value1, field2, value2, ...]`
fn extract_payload_from_fields(fields: &[RedisValue]) -> Option<Vec<u8>> {
    let mut iter = fields.iter();
    while let Some(field) = iter.next() {
        if let RedisValue::BulkString(field_name) = field {
            if field_name == b"payload" {
                if let Some(RedisValue::BulkString(payload)) = iter.next() {
                    return Some(payload.clone());
                }
            } else {
                iter.next();
            }
        }
    }
    None
}
