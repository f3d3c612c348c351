//! Cross-crate tests driven through the runtime wiring.

pub mod failures;
pub mod properties;
pub mod scenarios;
