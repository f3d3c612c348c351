//! # Index Calls
//!
//! The mutations the index contract accepts, and their signed envelope.
//!
//! ## Signing
//!
//! ```text
//! digest    = keccak256(bincode(call) || nonce_be)
//! signature = secp256k1_recoverable(signer, digest)
//! payload   = bincode(SignedCall { call, signer, nonce, signature })
//! ```
//!
//! The nonce is part of the digest, so a payload cannot be replayed under a
//! later nonce.

use crate::domain::LedgerError;
use crate::domain::RevertCode;
use serde::{Deserialize, Serialize};
use shared_crypto::{keccak256, recover_signer, LedgerSigner, RecoverableSignature};
use shared_types::{Address, DocumentKind, DocumentRecord, Hash, MutationKind};

/// One index mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexCall {
    /// Append `record` under `(kind, base_hash, record.version)`.
    AddDocument {
        /// Grouping key for listing (EHR or user scope).
        scope: Hash,
        kind: DocumentKind,
        base_hash: Hash,
        record: DocumentRecord,
    },
    /// Map a subject key to an EHR id.
    SetSubject { subject_key: Hash, ehr_id: String },
    /// Map a user key to an EHR id.
    SetUser { user_key: Hash, ehr_id: String },
    /// Tombstone one version.
    DeleteDocument {
        kind: DocumentKind,
        base_hash: Hash,
        version: [u8; 32],
    },
}

impl IndexCall {
    pub fn mutation_kind(&self) -> MutationKind {
        match self {
            IndexCall::AddDocument { .. } => MutationKind::AddDocument,
            IndexCall::SetSubject { .. } => MutationKind::SetSubject,
            IndexCall::SetUser { .. } => MutationKind::SetUser,
            IndexCall::DeleteDocument { .. } => MutationKind::DeleteDocument,
        }
    }
}

/// A call signed by its sender for one nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCall {
    pub call: IndexCall,
    pub signer: Address,
    pub nonce: u64,
    pub signature: RecoverableSignature,
}

impl SignedCall {
    pub fn sign(call: IndexCall, signer: &LedgerSigner, nonce: u64) -> Result<Self, LedgerError> {
        let digest = Self::digest(&call, nonce)?;
        let signature = signer.sign_digest(&digest)?;
        Ok(Self {
            call,
            signer: signer.address(),
            nonce,
            signature,
        })
    }

    pub fn digest(call: &IndexCall, nonce: u64) -> Result<Hash, LedgerError> {
        let mut bytes = bincode::serialize(call)?;
        bytes.extend_from_slice(&nonce.to_be_bytes());
        Ok(keccak256(&bytes))
    }

    /// Check that the signature recovers to `signer`.
    pub fn verify(&self) -> Result<(), LedgerError> {
        let digest = Self::digest(&self.call, self.nonce)?;
        match recover_signer(&digest, &self.signature) {
            Ok(addr) if addr == self.signer => Ok(()),
            _ => Err(LedgerError::Revert(RevertCode::BadSignature)),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, LedgerError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, LedgerError> {
        Ok(bincode::deserialize(bytes)?)
    }
}
