//! Adapters layer for the index ledger.

pub mod memory_ledger;

pub use memory_ledger::InMemoryLedger;
