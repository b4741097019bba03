//! Cache service.
//!
//! Two uses, both derived from authoritative state elsewhere:
//! 1. The auth fast path: a field lookup on the users hash populated by an
//!    out-of-band loader.
//! 2. The events-listing fast path: exact JSON response bodies keyed by
//!    (page, size).
//!
//! Reads are bounded by a short deadline so a degraded cache cannot slow a
//! request down; writes run on a detached task with their own budget and
//! never block the response path.

mod backend;
mod error;
mod key;
mod memory;
mod redis;

use std::sync::Arc;
use std::time::Duration;

pub use backend::CacheBackend;
pub use error::CacheError;
pub use key::CacheKey;
pub use memory::InMemoryCache;

use crate::core::config::{CacheBackendType, CacheConfig};
use crate::core::constants::{CACHE_READ_TIMEOUT_SECS, CACHE_WRITE_TIMEOUT_SECS};

pub struct CacheService {
    backend: Arc<dyn CacheBackend>,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("backend", &self.backend.backend_name())
            .finish()
    }
}

impl CacheService {
    /// Create a cache service from configuration
    pub async fn new(config: &CacheConfig) -> Result<Self, CacheError> {
        let backend: Arc<dyn CacheBackend> = match config.backend {
            CacheBackendType::Memory => {
                tracing::debug!("Initializing in-memory cache");
                Arc::new(InMemoryCache::new())
            }
            CacheBackendType::Valkey => Arc::new(redis::ValkeyCache::new(&config.url()).await?),
        };

        Ok(Self {
            backend,
            read_timeout: Duration::from_secs(CACHE_READ_TIMEOUT_SECS),
            write_timeout: Duration::from_secs(CACHE_WRITE_TIMEOUT_SECS),
        })
    }

    /// Wrap an existing backend (used by tests to share a seeded backend)
    pub fn with_backend(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            read_timeout: Duration::from_secs(CACHE_READ_TIMEOUT_SECS),
            write_timeout: Duration::from_secs(CACHE_WRITE_TIMEOUT_SECS),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Get raw bytes, bounded by the read deadline.
    ///
    /// The deadline is independent of the request deadline: a slow cache
    /// answers `Timeout` and the caller falls through to the store.
    pub async fn get_raw(&self, cache_key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        match tokio::time::timeout(self.read_timeout, self.backend.get(cache_key)).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout {
                timeout_ms: self.read_timeout.as_millis() as u64,
            }),
        }
    }

    /// Get a hash field, bounded by the read deadline
    pub async fn hget(&self, cache_key: &str, field: &str) -> Result<Option<String>, CacheError> {
        match tokio::time::timeout(self.read_timeout, self.backend.hget(cache_key, field)).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout {
                timeout_ms: self.read_timeout.as_millis() as u64,
            }),
        }
    }

    /// Write bytes on a detached task.
    ///
    /// Runs outside the request context so a client disconnect cannot leave
    /// partial cache state; failures are logged and swallowed.
    pub fn set_detached(&self, cache_key: String, value: Vec<u8>, ttl: Duration) {
        let backend = Arc::clone(&self.backend);
        let write_timeout = self.write_timeout;
        tokio::spawn(async move {
            let write = backend.set(&cache_key, value, Some(ttl));
            match tokio::time::timeout(write_timeout, write).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(key = %cache_key, error = %e, "Cache write failed");
                }
                Err(_) => {
                    tracing::warn!(key = %cache_key, "Cache write timed out");
                }
            }
        });
    }

    /// Delete a key, logging failures
    pub async fn invalidate_key(&self, cache_key: &str) {
        if let Err(e) = self.backend.delete(cache_key).await {
            tracing::warn!(key = %cache_key, error = %e, "Cache invalidation failed");
        }
    }

    /// Delete keys matching a glob pattern
    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        self.backend.delete_pattern(pattern).await
    }

    /// Health check
    pub async fn health_check(&self) -> Result<(), CacheError> {
        self.backend.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_service() -> Arc<CacheService> {
        Arc::new(CacheService::with_backend(Arc::new(InMemoryCache::new())))
    }

    #[tokio::test]
    async fn detached_write_lands_eventually() {
        let service = memory_service();
        service.set_detached(
            "k".to_string(),
            b"body".to_vec(),
            Duration::from_secs(60),
        );

        // The write runs on its own task; poll briefly
        for _ in 0..50 {
            if service.get_raw("k").await.unwrap().is_some() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("detached cache write never landed");
    }

    #[tokio::test]
    async fn invalidate_pattern_clears_listing_keys() {
        let backend = Arc::new(InMemoryCache::new());
        let service = Arc::new(CacheService::with_backend(backend.clone()));

        backend
            .set(&CacheKey::events_list(1, 5), b"a".to_vec(), None)
            .await
            .unwrap();
        backend
            .set(&CacheKey::events_list(2, 10), b"b".to_vec(), None)
            .await
            .unwrap();

        let deleted = service
            .invalidate_pattern(CacheKey::events_list_pattern())
            .await
            .unwrap();
        assert_eq!(deleted, 2);
    }
}
