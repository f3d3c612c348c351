//! Per-call caller context.

use std::time::Duration;

/// Who is calling, on which EHR system, and how long external legs may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: String,
    pub system_id: String,
    /// Overrides the configured external-call timeout.
    pub timeout: Option<Duration>,
}

impl RequestContext {
    pub fn new(user_id: impl Into<String>, system_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            system_id: system_id.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
