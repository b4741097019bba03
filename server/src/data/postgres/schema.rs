//! PostgreSQL schema definition.
//!
//! A single relational schema holds the authoritative state. Seat ids are
//! TEXT because the external event's seats carry provider-assigned ids that
//! are not guaranteed to be UUIDs.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initial schema
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY,
    version INTEGER NOT NULL,
    applied_at BIGINT NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at BIGINT NOT NULL,
    execution_time_ms BIGINT NOT NULL,
    success BOOLEAN NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    user_id BIGSERIAL PRIMARY KEY,
    email VARCHAR(255) UNIQUE NOT NULL,
    password_hash VARCHAR(64) NOT NULL,
    password_plain VARCHAR(255),
    first_name VARCHAR(255) NOT NULL DEFAULT '',
    surname VARCHAR(255) NOT NULL DEFAULT '',
    birthday DATE,
    registered_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    last_logged_in TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS events_archive (
    id BIGSERIAL PRIMARY KEY,
    title VARCHAR(255) NOT NULL,
    description TEXT,
    type VARCHAR(64) NOT NULL,
    datetime_start TIMESTAMPTZ NOT NULL,
    provider VARCHAR(255) NOT NULL DEFAULT '',
    external BOOLEAN NOT NULL DEFAULT FALSE,
    total_seats INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS seats (
    id TEXT PRIMARY KEY,
    event_id BIGINT NOT NULL REFERENCES events_archive(id) ON DELETE CASCADE,
    row_number INTEGER NOT NULL CHECK (row_number >= 1),
    seat_number INTEGER NOT NULL CHECK (seat_number >= 1),
    status VARCHAR(16) NOT NULL DEFAULT 'FREE',
    price BIGINT CHECK (price IS NULL OR price >= 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (event_id, row_number, seat_number),
    CHECK (status IN ('FREE', 'RESERVED', 'SOLD'))
);

CREATE INDEX IF NOT EXISTS seats_event_order_idx
    ON seats (event_id, row_number, seat_number);
CREATE INDEX IF NOT EXISTS seats_event_status_idx
    ON seats (event_id, status);

CREATE TABLE IF NOT EXISTS bookings (
    id BIGSERIAL PRIMARY KEY,
    event_id BIGINT NOT NULL REFERENCES events_archive(id) ON DELETE CASCADE,
    user_id BIGINT REFERENCES users(user_id),
    status VARCHAR(16) NOT NULL DEFAULT 'CREATED',
    payment_status VARCHAR(16) NOT NULL DEFAULT 'PENDING',
    total_amount VARCHAR(32),
    payment_id VARCHAR(255),
    order_id VARCHAR(255),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CHECK (status IN ('CREATED', 'CONFIRMED', 'CANCELLED', 'EXPIRED')),
    CHECK (payment_status IN ('PENDING', 'INITIATED', 'COMPLETED', 'FAILED', 'CANCELLED'))
);

CREATE INDEX IF NOT EXISTS bookings_user_created_idx
    ON bookings (user_id, created_at DESC);
CREATE INDEX IF NOT EXISTS bookings_payment_id_idx
    ON bookings (payment_id);
CREATE INDEX IF NOT EXISTS bookings_expiration_idx
    ON bookings (created_at)
    WHERE status = 'CREATED' AND payment_status = 'PENDING';

CREATE TABLE IF NOT EXISTS booking_seats (
    id BIGSERIAL PRIMARY KEY,
    booking_id BIGINT NOT NULL REFERENCES bookings(id) ON DELETE CASCADE,
    seat_id TEXT NOT NULL REFERENCES seats(id) ON DELETE CASCADE,
    reserved_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (booking_id, seat_id)
);

CREATE INDEX IF NOT EXISTS booking_seats_seat_idx ON booking_seats (seat_id);
"#;
