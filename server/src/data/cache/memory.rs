//! In-memory cache backend.
//!
//! moka handles the main key space with per-entry TTLs; hash keys (only the
//! auth users hash in practice) live in a plain locked map since they are
//! few and long-lived.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use parking_lot::RwLock;

use super::backend::CacheBackend;
use super::error::CacheError;

const DEFAULT_MAX_ENTRIES: u64 = 100_000;

#[derive(Clone)]
struct CacheEntry {
    data: Vec<u8>,
    ttl: Option<Duration>,
}

struct VariableTtlExpiry;

impl Expiry<String, CacheEntry> for VariableTtlExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_read(
        &self,
        _key: &String,
        _value: &CacheEntry,
        _read_at: Instant,
        duration_until_expiry: Option<Duration>,
        _last_modified_at: Instant,
    ) -> Option<Duration> {
        duration_until_expiry
    }
}

pub struct InMemoryCache {
    cache: Cache<String, CacheEntry>,
    hashes: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(DEFAULT_MAX_ENTRIES)
            .expire_after(VariableTtlExpiry)
            .build();

        Self {
            cache,
            hashes: RwLock::new(HashMap::new()),
        }
    }

    /// Seed a hash field (test fixture for the auth fast path)
    pub fn hset(&self, key: &str, field: &str, value: &str) {
        self.hashes
            .write()
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.cache.get(key).await.map(|e| e.data))
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        self.cache
            .insert(key.to_string(), CacheEntry { data: value, ttl })
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.cache.remove(key).await.is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.cache.contains_key(key))
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, CacheError> {
        Ok(self
            .hashes
            .read()
            .get(key)
            .and_then(|h| h.get(field))
            .cloned())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        // Only trailing-star globs are used in practice
        let prefix = pattern.strip_suffix('*').unwrap_or(pattern);
        let keys: Vec<String> = self
            .cache
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.as_ref().clone())
            .collect();

        let mut deleted = 0u64;
        for key in keys {
            if self.cache.remove(&key).await.is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_delete() {
        let cache = InMemoryCache::new();
        cache.set("k", b"v".to_vec(), None).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert!(cache.delete("k").await.unwrap());
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn ttl_expires_entries() {
        let cache = InMemoryCache::new();
        cache
            .set("k", b"v".to_vec(), Some(Duration::from_millis(20)))
            .await
            .unwrap();
        assert!(cache.exists("k").await.unwrap());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn hget_reads_seeded_fields() {
        let cache = InMemoryCache::new();
        cache.hset("users:auth", "field1", "42");
        assert_eq!(
            cache.hget("users:auth", "field1").await.unwrap(),
            Some("42".to_string())
        );
        assert_eq!(cache.hget("users:auth", "other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_pattern_removes_matching_keys() {
        let cache = InMemoryCache::new();
        cache
            .set("events:list:page:1:size:5", b"a".to_vec(), None)
            .await
            .unwrap();
        cache
            .set("events:list:page:2:size:5", b"b".to_vec(), None)
            .await
            .unwrap();
        cache.set("other", b"c".to_vec(), None).await.unwrap();

        let deleted = cache.delete_pattern("events:list:*").await.unwrap();
        assert_eq!(deleted, 2);
        assert!(cache.exists("other").await.unwrap());
    }
}
