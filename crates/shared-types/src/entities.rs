//! # Core Domain Entities
//!
//! Kinds of documents stored by the gateway and kinds of index mutations
//! submitted to the ledger.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte hash (SHA3-256, Keccak-256 or BLAKE3 depending on use).
pub type Hash = [u8; 32];

/// A 20-byte Ethereum-style address of a ledger signer.
pub type Address = [u8; 20];

/// Hash of a submitted ledger transaction.
pub type TxHash = [u8; 32];

/// Document types kept in the index.
///
/// The discriminant is part of the index key, so values must never be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum DocumentKind {
    /// The EHR root document.
    Ehr = 1,
    /// The EHR_STATUS document carrying the subject reference.
    EhrStatus = 2,
    /// A clinical composition.
    Composition = 3,
    /// A stored query definition.
    Query = 4,
}

impl DocumentKind {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Ehr => "ehr",
            DocumentKind::EhrStatus => "ehr_status",
            DocumentKind::Composition => "composition",
            DocumentKind::Query => "query",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tags for index mutations carried inside one ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MutationKind {
    /// Append a document record.
    AddDocument = 1,
    /// Map a subject (id + namespace) to an EHR.
    SetSubject = 2,
    /// Map a user to an EHR.
    SetUser = 3,
    /// Flip a document record to DELETED.
    DeleteDocument = 4,
}

impl MutationKind {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::AddDocument => "add_document",
            MutationKind::SetSubject => "set_subject",
            MutationKind::SetUser => "set_user",
            MutationKind::DeleteDocument => "delete_document",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
