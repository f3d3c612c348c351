//! # Outbound Ports (Driven Ports)
//!
//! External systems the save and read pipelines depend on.

use crate::domain::{ContentError, ContentId, DealError, DealId, DealInfo, DealStatus};

/// Content-addressed blob store.
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `bytes` and return their identifier.
    async fn add(&self, bytes: Vec<u8>) -> Result<ContentId, ContentError>;

    /// Fetch the bytes stored under `cid`.
    async fn fetch(&self, cid: &ContentId) -> Result<Vec<u8>, ContentError>;
}

/// Deal settlement network providing durable custody of stored content.
#[async_trait::async_trait]
pub trait DealSettlement: Send + Sync {
    /// Propose a deal for `cid` of `size_bytes`.
    async fn start_deal(&self, cid: &ContentId, size_bytes: u64) -> Result<DealInfo, DealError>;

    /// Current status of a deal.
    async fn deal_status(&self, deal_id: &DealId) -> Result<DealStatus, DealError>;
}
