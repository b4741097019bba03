//! Application-wide constants and configuration defaults.

/// Application name, used for logging defaults and bus client ids
pub const APP_NAME: &str = "kassa";

// =============================================================================
// Server
// =============================================================================

pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Graceful shutdown budget for background tasks
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Store (PostgreSQL)
// =============================================================================

/// Pool sized so peak concurrent requests cannot starve it
pub const DB_DEFAULT_MAX_OPEN_CONNS: u32 = 100;
pub const DB_DEFAULT_MAX_IDLE_CONNS: u32 = 25;
pub const DB_DEFAULT_CONN_MAX_LIFETIME_MIN: u64 = 5;
pub const DB_DEFAULT_CONN_MAX_IDLE_TIME_MIN: u64 = 1;
pub const DB_DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

/// Readiness probe budget
pub const DB_PING_TIMEOUT_SECS: u64 = 2;

// =============================================================================
// Cache (Valkey)
// =============================================================================

pub const VALKEY_DEFAULT_ADDR: &str = "localhost:6379";
pub const VALKEY_DEFAULT_USERS_HASH_KEY: &str = "users:auth";
pub const VALKEY_DEFAULT_AUTH_TTL_MIN: u64 = 10;
pub const VALKEY_DEFAULT_EVENTS_TTL_MIN: u64 = 15;
pub const VALKEY_DEFAULT_CLIENT_CACHE_MB: u64 = 128;

/// Upper bound on any cache read so a degraded cache cannot add latency
pub const CACHE_READ_TIMEOUT_SECS: u64 = 2;

/// Budget for detached cache writes
pub const CACHE_WRITE_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// Bus (stream topics)
// =============================================================================

/// Queue group shared by all workflow consumers
pub const BUS_DEFAULT_GROUP: &str = "kassa-workers";

/// Redelivery window: unacked messages are claimable after this long
pub const BUS_ACK_WAIT_SECS: u64 = 30;

/// How often a consumer sweeps for stuck (unacked) messages
pub const BUS_CLAIM_INTERVAL_SECS: u64 = 10;

// =============================================================================
// Search (Elasticsearch)
// =============================================================================

pub const SEARCH_DEFAULT_INDEX: &str = "events";
pub const SEARCH_DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const SEARCH_DEFAULT_MAX_RETRIES: u32 = 3;

// =============================================================================
// External providers
// =============================================================================

pub const TICKETING_DEFAULT_URL: &str = "https://hub.hackload.kz/event-provider/common";
pub const PAYMENT_DEFAULT_URL: &str = "https://hub.hackload.kz/payment-provider/common";
pub const EXTERNAL_DEFAULT_TIMEOUT_SECS: u64 = 30;

/// The reserved event whose inventory lives at the ticketing provider
pub const EXTERNAL_EVENT_ID: i64 = 1;

// =============================================================================
// Booking lifecycle
// =============================================================================

/// Sweep cadence of the expiration job
pub const EXPIRATION_CHECK_INTERVAL_SECS: u64 = 30;

/// Reservation window: CREATED/PENDING bookings older than this are cancelled
pub const BOOKING_EXPIRATION_MIN: i64 = 15;

// =============================================================================
// API surface
// =============================================================================

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_EVENTS_PAGE_SIZE: u32 = 20;
pub const DEFAULT_SEATS_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 20;
