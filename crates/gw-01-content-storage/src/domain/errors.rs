//! # Content Storage Errors

use super::{ContentId, DealId};
use shared_types::GatewayError;
use thiserror::Error;

/// Errors returned by a [`crate::ContentStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    /// No blob stored under this identifier.
    #[error("content {0} not found")]
    NotFound(ContentId),

    /// Store unreachable or rejected the request.
    #[error("content store unavailable: {0}")]
    Unavailable(String),

    /// Stored bytes no longer hash to their identifier.
    #[error("content {0} failed integrity check")]
    Corrupted(ContentId),
}

/// Errors returned by a [`crate::DealSettlement`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DealError {
    /// The network refused the deal proposal.
    #[error("deal rejected: {0}")]
    Rejected(String),

    /// Network unreachable.
    #[error("deal settlement unavailable: {0}")]
    Unavailable(String),

    /// Status requested for a deal the network does not know.
    #[error("unknown deal {0}")]
    UnknownDeal(DealId),
}

impl From<ContentError> for GatewayError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::NotFound(_) => GatewayError::NotFound(err.to_string()),
            ContentError::Unavailable(_) | ContentError::Corrupted(_) => {
                GatewayError::Internal(err.to_string())
            }
        }
    }
}

impl From<DealError> for GatewayError {
    fn from(err: DealError) -> Self {
        match err {
            DealError::UnknownDeal(_) => GatewayError::NotFound(err.to_string()),
            DealError::Rejected(_) | DealError::Unavailable(_) => {
                GatewayError::Internal(err.to_string())
            }
        }
    }
}
