//! Processing tracker errors.

use crate::domain::RequestId;
use shared_types::GatewayError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessingError {
    #[error("unknown processing request {0}")]
    UnknownRequest(RequestId),
}

impl From<ProcessingError> for GatewayError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::UnknownRequest(_) => GatewayError::NotFound(err.to_string()),
        }
    }
}
