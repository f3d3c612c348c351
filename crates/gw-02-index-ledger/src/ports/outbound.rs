//! # Outbound Ports
//!
//! The ledger node as seen by the client. Writes go through `submit` as one
//! signed transaction; reads are contract view calls.

use crate::domain::LedgerError;
use async_trait::async_trait;
use shared_types::{Address, DocumentKind, DocumentRecord, Hash, TxHash};

/// One transaction carrying a batch of encoded `SignedCall` payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTransaction {
    pub from: Address,
    pub nonce: u64,
    pub calls: Vec<Vec<u8>>,
}

/// Inclusion state of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed(String),
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxStatus::Pending)
    }
}

/// Record lookups supported by the index contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordQuery {
    /// Exact version. `None` resolves to the latest version.
    ByVersion {
        kind: DocumentKind,
        base_hash: Hash,
        version: Option<[u8; 32]>,
    },
    /// The record flagged as last for the base identity.
    LastByBase { kind: DocumentKind, base_hash: Hash },
    /// Latest record whose timestamp is not after `at`.
    NearestTime {
        kind: DocumentKind,
        base_hash: Hash,
        at: u32,
    },
}

/// Access to a ledger node hosting the index contract.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    /// Next nonce the ledger will accept from `address`, counting pending txs.
    async fn pending_nonce(&self, address: &Address) -> Result<u64, LedgerError>;

    /// Submit one transaction. Reverts are returned as `LedgerError::Revert`.
    async fn submit(&self, tx: LedgerTransaction) -> Result<TxHash, LedgerError>;

    async fn tx_status(&self, tx_hash: &TxHash) -> Result<TxStatus, LedgerError>;

    async fn get_record(&self, query: RecordQuery) -> Result<DocumentRecord, LedgerError>;

    /// All records added under `scope` for `kind`, in insertion order.
    async fn list_records(
        &self,
        scope: &Hash,
        kind: DocumentKind,
    ) -> Result<Vec<DocumentRecord>, LedgerError>;

    async fn ehr_by_user(&self, user_key: &Hash) -> Result<String, LedgerError>;

    async fn ehr_by_subject(&self, subject_key: &Hash) -> Result<String, LedgerError>;
}
