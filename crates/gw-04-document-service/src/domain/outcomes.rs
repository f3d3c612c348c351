//! Results returned by the document services.

use gw_03_processing::RequestId;
use shared_types::VersionedId;

/// A saved document version and the request tracking its legs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedDocument {
    pub id: VersionedId,
    pub request_id: RequestId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EhrCreated {
    pub ehr_id: String,
    pub ehr_version: VersionedId,
    pub status_id: VersionedId,
    pub request_id: RequestId,
}

/// Result of a soft delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Advisory next version id; no record exists for it.
    pub next_version: VersionedId,
    pub request_id: RequestId,
}
