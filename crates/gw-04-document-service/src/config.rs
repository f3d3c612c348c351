//! Document service configuration.

use gw_01_content_storage::CompressionConfig;
use std::time::Duration;

/// Settings the document pipelines need. Built by the runtime from its
/// own configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentServiceConfig {
    /// EHR system id, used as the authority of every versioned id.
    pub system_id: String,
    pub compression: CompressionConfig,
    /// Bound on content store and deal settlement calls when the caller
    /// supplies none.
    pub external_timeout: Duration,
}

impl Default for DocumentServiceConfig {
    fn default() -> Self {
        Self {
            system_id: "gateway.ehr.local".to_string(),
            compression: CompressionConfig::default(),
            external_timeout: Duration::from_secs(30),
        }
    }
}
