//! # Ledger Errors
//!
//! Ledgers report failures as revert reason strings. [`RevertCode::from_reason`]
//! is the only place those strings are inspected; everything downstream
//! matches on the typed code.

use shared_crypto::CryptoError;
use shared_types::GatewayError;
use std::fmt;
use thiserror::Error;

/// Classified revert reason of the index contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertCode {
    /// `NFD`: no such record or mapping.
    NotFound,
    /// `AEX`: record or mapping already present.
    AlreadyExists,
    /// `ADL`: record is already a tombstone.
    AlreadyDeleted,
    /// `DND`: signer does not own the record.
    AccessDenied,
    /// `NNC`: transaction nonce does not match the account nonce.
    NonceMismatch,
    /// `SIG`: call signature does not recover to the sender.
    BadSignature,
    /// Anything unclassified, verbatim.
    Other(String),
}

impl RevertCode {
    /// Classify a raw revert reason such as `"execution reverted: NFD"`.
    pub fn from_reason(reason: &str) -> Self {
        const CODES: [(&str, RevertCode); 6] = [
            ("NFD", RevertCode::NotFound),
            ("AEX", RevertCode::AlreadyExists),
            ("ADL", RevertCode::AlreadyDeleted),
            ("DND", RevertCode::AccessDenied),
            ("NNC", RevertCode::NonceMismatch),
            ("SIG", RevertCode::BadSignature),
        ];
        CODES
            .into_iter()
            .find(|(tag, _)| reason.contains(tag))
            .map(|(_, code)| code)
            .unwrap_or_else(|| RevertCode::Other(reason.to_string()))
    }

    /// Short reason string as emitted by the contract.
    pub fn reason(&self) -> &str {
        match self {
            RevertCode::NotFound => "NFD",
            RevertCode::AlreadyExists => "AEX",
            RevertCode::AlreadyDeleted => "ADL",
            RevertCode::AccessDenied => "DND",
            RevertCode::NonceMismatch => "NNC",
            RevertCode::BadSignature => "SIG",
            RevertCode::Other(s) => s,
        }
    }
}

impl fmt::Display for RevertCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Errors from ledger calls and batch handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The contract rejected the call.
    #[error("ledger reverted: {0}")]
    Revert(RevertCode),

    /// The ledger node could not be reached.
    #[error("ledger transport: {0}")]
    Transport(String),

    /// The ledger node did not answer in time.
    #[error("ledger call timed out")]
    Timeout,

    /// Signing or key handling failed.
    #[error("ledger signing: {0}")]
    Crypto(#[from] CryptoError),

    /// A call could not be (de)serialized.
    #[error("ledger call encoding: {0}")]
    Encoding(String),

    /// `commit` was called on a batch without payloads.
    #[error("batch has no calls")]
    EmptyBatch,
}

impl LedgerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::Revert(RevertCode::NotFound))
    }
}

impl From<bincode::Error> for LedgerError {
    fn from(err: bincode::Error) -> Self {
        LedgerError::Encoding(err.to_string())
    }
}

impl From<LedgerError> for GatewayError {
    fn from(err: LedgerError) -> Self {
        let msg = err.to_string();
        match err {
            LedgerError::Revert(RevertCode::NotFound) => GatewayError::NotFound(msg),
            LedgerError::Revert(RevertCode::AlreadyExists) => GatewayError::AlreadyExists(msg),
            LedgerError::Revert(RevertCode::AlreadyDeleted) => GatewayError::AlreadyDeleted(msg),
            LedgerError::Revert(RevertCode::AccessDenied | RevertCode::BadSignature) => {
                GatewayError::AccessDenied(msg)
            }
            LedgerError::Timeout => GatewayError::Timeout(msg),
            LedgerError::Crypto(e) => e.into(),
            LedgerError::Revert(_)
            | LedgerError::Transport(_)
            | LedgerError::Encoding(_)
            | LedgerError::EmptyBatch => GatewayError::Internal(msg),
        }
    }
}
