//! # Gateway Container
//!
//! Configuration and dependency wiring for the gateway process.

pub mod config;
pub mod services;

pub use config::{ConfigError, GatewayConfig};
pub use services::GatewayContainer;
