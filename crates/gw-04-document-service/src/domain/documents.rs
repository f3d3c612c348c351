//! # Documents
//!
//! The document shapes the gateway persists. Field semantics of the clinical
//! model are not interpreted here; the gateway only needs identifiers, the
//! subject reference and a display name.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared_types::DocumentKind;

/// A document that goes through the content-store pipeline.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const KIND: DocumentKind;

    /// Display name stored encrypted on the index record, if any.
    fn name(&self) -> Option<&str> {
        None
    }
}

/// Reference to another document by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub id: String,
    pub namespace: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// The EHR root document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ehr {
    pub system_id: String,
    pub ehr_id: String,
    /// Points at the status by base uid, so status updates leave the EHR
    /// document untouched.
    pub ehr_status: ObjectRef,
    /// RFC 3339.
    pub time_created: String,
}

impl Document for Ehr {
    const KIND: DocumentKind = DocumentKind::Ehr;
}

/// External reference to the subject of care.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRef {
    pub id: String,
    pub namespace: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartySelf {
    pub external_ref: Option<PartyRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EhrStatus {
    /// Versioned id of this status version.
    pub uid: String,
    pub archetype_node_id: String,
    pub name: String,
    pub subject: PartySelf,
    pub is_queryable: bool,
    pub is_modifiable: bool,
}

impl EhrStatus {
    /// Default status of a new EHR for the given subject.
    pub fn new(uid: impl Into<String>, subject_id: &str, namespace: &str) -> Self {
        Self {
            uid: uid.into(),
            archetype_node_id: "openEHR-EHR-EHR_STATUS.generic.v1".to_string(),
            name: "EHR Status".to_string(),
            subject: PartySelf {
                external_ref: Some(PartyRef {
                    id: subject_id.to_string(),
                    namespace: namespace.to_string(),
                }),
            },
            is_queryable: true,
            is_modifiable: true,
        }
    }

    pub fn subject_ref(&self) -> Option<&PartyRef> {
        self.subject.external_ref.as_ref()
    }
}

impl Document for EhrStatus {
    const KIND: DocumentKind = DocumentKind::EhrStatus;

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

/// A clinical composition. The body is kept as opaque JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    pub uid: String,
    pub name: String,
    pub content: serde_json::Value,
}

impl Composition {
    pub fn new(name: impl Into<String>, content: serde_json::Value) -> Self {
        Self {
            uid: String::new(),
            name: name.into(),
            content,
        }
    }
}

impl Document for Composition {
    const KIND: DocumentKind = DocumentKind::Composition;

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

/// A stored query definition. Kept inline on its index record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredQuery {
    pub name: String,
    pub query_type: String,
    pub version: String,
    /// RFC 3339.
    pub saved: String,
    pub q: String,
}

/// Listing entry for compositions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentItem {
    pub name: String,
    pub uid: String,
    /// RFC 3339.
    pub time_created: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_defaults() {
        let status = EhrStatus::new("a::SYS1::1", "S1", "ns");
        assert_eq!(status.subject_ref().map(|r| r.id.as_str()), Some("S1"));
        assert!(status.is_modifiable);
        assert_eq!(status.name(), Some("EHR Status"));
    }

    #[test]
    fn test_object_ref_wire_name() {
        let r = ObjectRef {
            id: "x".into(),
            namespace: "local".into(),
            kind: "EHR_STATUS".into(),
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["type"], "EHR_STATUS");
    }
}
