//! Data layer: authoritative store plus derived systems.
//!
//! PostgreSQL is the sole authoritative state holder. The cache, the search
//! index and the stream topics are derived views; every read path must be
//! able to fall back to the store.

pub mod cache;
pub mod postgres;
pub mod search;
pub mod topics;
pub mod types;
