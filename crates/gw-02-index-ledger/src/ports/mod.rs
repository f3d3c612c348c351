//! Ports layer for the index ledger.

pub mod outbound;

pub use outbound::{LedgerTransaction, LedgerTransport, RecordQuery, TxStatus};
