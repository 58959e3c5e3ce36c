//! Verity Server
//!
//! Thin transport around the session core: configuration, logging setup,
//! and the axum router exposing the WebSocket session endpoint plus
//! health and reload routes.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod transport;

// Re-exports
pub use config::{CliOverrides, Config, LogFormat, DEFAULT_CONFIG_FILE};
pub use error::ConfigError;
pub use transport::{router, AppState, HealthReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
