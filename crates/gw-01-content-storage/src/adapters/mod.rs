//! In-memory adapters for the content storage ports.

pub mod memory;

pub use memory::{InMemoryContentStore, InMemoryDealSettlement};
