//! Cache backend trait definition

use std::time::Duration;

use async_trait::async_trait;

use super::error::CacheError;

/// Key→bytes cache backend.
///
/// Implemented by the in-memory backend (tests, single-node development) and
/// the Valkey backend (production). Per-key operations are atomic; results of
/// `exists`/`delete` are best-effort under concurrency, which is acceptable
/// for a derived store.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a value
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Set a value with an optional TTL
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>)
    -> Result<(), CacheError>;

    /// Delete a key. Returns whether the key existed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Check whether a key exists
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Get a field from a hash key (the auth users hash)
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, CacheError>;

    /// Delete keys matching a glob pattern, returning the number removed.
    /// O(n) for the memory backend; SCAN-based for Valkey.
    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError>;

    /// Health check (validates connectivity)
    async fn health_check(&self) -> Result<(), CacheError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}
