//! Core application plumbing: configuration, constants, shutdown.

pub mod config;
pub mod constants;
pub mod shutdown;

pub use config::AppConfig;
pub use shutdown::ShutdownService;
