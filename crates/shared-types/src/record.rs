//! # Index Records
//!
//! The metadata entry the ledger index keeps for every document version.
//! Attributes are an ordered, code-keyed association list: new codes can be
//! introduced without changing the record shape. Which codes a document type
//! requires is checked by the service layer, never here.

use crate::errors::GatewayError;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an index record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentStatus {
    Active,
    /// Tombstone. Distinguishes "was deleted" from "never existed".
    Deleted,
}

/// Attribute codes stored on index records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum AttributeCode {
    /// Content identifier encrypted under the document key.
    ContentIdEncrypted = 1,
    /// Document key sealed to the owner's public key.
    KeyEncrypted = 2,
    /// SHA3-256 of the document uid.
    BaseIdHash = 3,
    /// Full versioned id encrypted under the document key.
    LogicalIdEncrypted = 4,
    /// Deal identifier issued by the settlement network.
    DealId = 5,
    /// Custodian holding the deal.
    CustodianAddress = 6,
    /// Display name encrypted under the document key.
    NameEncrypted = 7,
    /// Inline encrypted body (stored queries only).
    ContentEncrypted = 8,
}

impl AttributeCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeCode::ContentIdEncrypted => "content_id_encrypted",
            AttributeCode::KeyEncrypted => "key_encrypted",
            AttributeCode::BaseIdHash => "base_id_hash",
            AttributeCode::LogicalIdEncrypted => "logical_id_encrypted",
            AttributeCode::DealId => "deal_id",
            AttributeCode::CustodianAddress => "custodian_address",
            AttributeCode::NameEncrypted => "name_encrypted",
            AttributeCode::ContentEncrypted => "content_encrypted",
        }
    }
}

/// Ordered `(code, value)` list. A code appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes(Vec<(AttributeCode, Vec<u8>)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Attributes::set`].
    pub fn with(mut self, code: AttributeCode, value: impl Into<Vec<u8>>) -> Self {
        self.set(code, value);
        self
    }

    /// Append `code`, or replace its value in place if already present.
    pub fn set(&mut self, code: AttributeCode, value: impl Into<Vec<u8>>) {
        let value = value.into();
        match self.0.iter_mut().find(|(c, _)| *c == code) {
            Some(slot) => slot.1 = value,
            None => self.0.push((code, value)),
        }
    }

    pub fn get(&self, code: AttributeCode) -> Option<&[u8]> {
        self.0
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, v)| v.as_slice())
    }

    /// Like [`Attributes::get`], but a missing or empty value is a corrupt record.
    pub fn require(&self, code: AttributeCode) -> Result<&[u8], GatewayError> {
        match self.get(code) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(GatewayError::FieldEmpty(code.as_str().to_string())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (AttributeCode, &[u8])> {
        self.0.iter().map(|(c, v)| (*c, v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Index entry for one document version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub status: DocumentStatus,
    /// Content identifier bytes (or the id hash for inline documents).
    pub content_id: Vec<u8>,
    /// `VersionedId::version_bytes()`, `None` for unversioned documents.
    pub version: Option<[u8; 32]>,
    /// Unix seconds at save time.
    pub timestamp: u32,
    /// Set on the most recently written version of a base identity.
    pub is_last: bool,
    pub attributes: Attributes,
}

impl DocumentRecord {
    /// A freshly written record: ACTIVE and flagged as last.
    pub fn active(
        content_id: Vec<u8>,
        version: Option<[u8; 32]>,
        timestamp: u32,
        attributes: Attributes,
    ) -> Self {
        Self {
            status: DocumentStatus::Active,
            content_id,
            version,
            timestamp,
            is_last: true,
            attributes,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.status == DocumentStatus::Deleted
    }
}
