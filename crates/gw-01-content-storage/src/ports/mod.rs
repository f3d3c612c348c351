//! Ports layer for content storage.

pub mod outbound;

pub use outbound::{ContentStore, DealSettlement};
