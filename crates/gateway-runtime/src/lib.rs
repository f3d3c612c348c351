//! # Gateway Runtime Library
//!
//! Wiring and the caller-facing API of the clinical document gateway. The
//! binary entry point is `main.rs`.
//!
//! ## Modules
//!
//! - `container/` - configuration and dependency wiring
//! - `adapters/` - metering decorators over the outbound ports
//! - `gateway` - the document API with metrics

pub mod adapters;
pub mod container;
pub mod gateway;

pub use container::{ConfigError, GatewayConfig, GatewayContainer};
pub use gateway::{DocumentRef, Gateway};
