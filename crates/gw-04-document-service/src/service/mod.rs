//! Document services built on [`crate::pipeline::DocumentPipeline`].

pub mod composition;
pub mod ehr;
pub mod query;
pub mod status;

pub use composition::CompositionService;
pub use ehr::EhrService;
pub use query::{QueryService, DEFAULT_QUERY_VERSION};
pub use status::StatusService;

use shared_crypto::sha3_256_many;
use shared_types::Hash;

/// Listing scope of the documents belonging to one EHR.
pub fn ehr_scope(ehr_id: &str) -> Hash {
    sha3_256_many(&[b"ehr\0", ehr_id.as_bytes()])
}

/// Listing scope of the stored queries of one user on one system.
pub fn query_scope(user_id: &str, system_id: &str) -> Hash {
    sha3_256_many(&[b"query\0", user_id.as_bytes(), b"\0", system_id.as_bytes()])
}

/// RFC 3339 rendering of a Unix timestamp.
pub(crate) fn rfc3339(unix: u64) -> String {
    i64::try_from(unix)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .unwrap_or_default()
        .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
