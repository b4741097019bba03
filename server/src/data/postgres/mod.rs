//! PostgreSQL store
//!
//! The sole authoritative state holder. Provides:
//! - Connection pooling sized for peak request concurrency
//! - Row-level pessimistic locking for seat reservation
//! - Schema initialization and versioned migrations
//! - Readiness probe and pool statistics

pub mod error;
mod migrations;
pub mod repositories;
pub mod schema;

pub use error::StoreError;
pub use sqlx::PgPool;

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};

use crate::core::config::DatabaseConfig;
use crate::core::constants::DB_PING_TIMEOUT_SECS;

/// Pool statistics snapshot for monitoring
#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
    pub max_open: u32,
}

/// PostgreSQL store service.
///
/// Created once at startup; the pool handle is cheap to clone and shared
/// across all request tasks.
pub struct PostgresService {
    pool: PgPool,
    max_open: u32,
}

impl PostgresService {
    /// Initialize the store from configuration and run migrations
    pub async fn init(config: &DatabaseConfig) -> Result<Self, StoreError> {
        if config.host.is_empty() {
            return Err(StoreError::Config("DB_HOST is required".into()));
        }

        let ssl_mode = match config.sslmode.as_str() {
            "disable" => PgSslMode::Disable,
            "require" => PgSslMode::Require,
            "verify-ca" => PgSslMode::VerifyCa,
            "verify-full" => PgSslMode::VerifyFull,
            _ => PgSslMode::Prefer,
        };

        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.name)
            .ssl_mode(ssl_mode);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_open_conns)
            .min_connections(config.max_idle_conns)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.conn_max_idle_time)
            .max_lifetime(config.conn_max_lifetime)
            .connect_with(options)
            .await?;

        tracing::debug!(
            host = %config.host,
            database = %config.name,
            max_open = config.max_open_conns,
            max_idle = config.max_idle_conns,
            "PostgreSQL pool created"
        );

        migrations::run_migrations(&pool).await?;

        Ok(Self {
            pool,
            max_open: config.max_open_conns,
        })
    }

    /// Shared pool handle
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Readiness probe: ping with a bounded timeout
    pub async fn ping(&self) -> Result<(), StoreError> {
        let probe = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool);
        match tokio::time::timeout(Duration::from_secs(DB_PING_TIMEOUT_SECS), probe).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(StoreError::Database(e)),
            Err(_) => Err(StoreError::PingTimeout {
                timeout_secs: DB_PING_TIMEOUT_SECS,
            }),
        }
    }

    /// Pool statistics for the health endpoint
    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            max_open: self.max_open,
        }
    }

    /// Close the pool, waiting for checked-out connections to return
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
