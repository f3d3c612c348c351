//! # In-Memory Storage Adapters
//!
//! `HashMap`-backed implementations of [`ContentStore`] and [`DealSettlement`]
//! for tests and the development runtime.
//!
//! - Deals stay `Pending` until [`InMemoryDealSettlement::settle_all`] or
//!   [`InMemoryDealSettlement::fail_deal`] is called.
//! - Both adapters can be switched "offline" to exercise failure paths, and
//!   deal creation can be delayed to exercise timeouts.

use crate::domain::{
    ContentError, ContentId, CustodianAddress, DealError, DealId, DealInfo, DealStatus,
};
use crate::ports::{ContentStore, DealSettlement};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

// =============================================================================
// CONTENT STORE
// =============================================================================

/// In-memory content-addressed store.
#[derive(Default)]
pub struct InMemoryContentStore {
    blobs: RwLock<HashMap<ContentId, Vec<u8>>>,
    offline: AtomicBool,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    fn check_online(&self) -> Result<(), ContentError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ContentError::Unavailable("content store offline".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ContentStore for InMemoryContentStore {
    async fn add(&self, bytes: Vec<u8>) -> Result<ContentId, ContentError> {
        self.check_online()?;
        let cid = ContentId::for_bytes(&bytes);
        debug!(cid = %cid, size = bytes.len(), "content stored");
        self.blobs.write().insert(cid.clone(), bytes);
        Ok(cid)
    }

    async fn fetch(&self, cid: &ContentId) -> Result<Vec<u8>, ContentError> {
        self.check_online()?;
        let bytes = self
            .blobs
            .read()
            .get(cid)
            .cloned()
            .ok_or_else(|| ContentError::NotFound(cid.clone()))?;
        if !cid.matches(&bytes) {
            return Err(ContentError::Corrupted(cid.clone()));
        }
        Ok(bytes)
    }
}

// =============================================================================
// DEAL SETTLEMENT
// =============================================================================

#[derive(Debug, Clone)]
struct DealEntry {
    cid: ContentId,
    size: u64,
    status: DealStatus,
}

/// In-memory deal settlement network with a single custodian.
pub struct InMemoryDealSettlement {
    custodian: CustodianAddress,
    deals: RwLock<HashMap<DealId, DealEntry>>,
    next_id: AtomicU64,
    offline: AtomicBool,
    delay: RwLock<Option<Duration>>,
}

impl Default for InMemoryDealSettlement {
    fn default() -> Self {
        Self::new("f01000")
    }
}

impl InMemoryDealSettlement {
    pub fn new(custodian: impl Into<String>) -> Self {
        Self {
            custodian: CustodianAddress(custodian.into()),
            deals: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            offline: AtomicBool::new(false),
            delay: RwLock::new(None),
        }
    }

    /// Make every call fail with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Sleep this long inside `start_deal`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write() = delay;
    }

    /// Move every pending deal to `Active`. Returns how many changed.
    pub fn settle_all(&self) -> usize {
        let mut deals = self.deals.write();
        let mut settled = 0;
        for entry in deals.values_mut() {
            if entry.status == DealStatus::Pending {
                entry.status = DealStatus::Active;
                settled += 1;
            }
        }
        settled
    }

    /// Permanently fail one deal.
    pub fn fail_deal(&self, deal_id: &DealId, reason: &str) -> Result<(), DealError> {
        let mut deals = self.deals.write();
        let entry = deals
            .get_mut(deal_id)
            .ok_or_else(|| DealError::UnknownDeal(deal_id.clone()))?;
        entry.status = DealStatus::Failed(reason.to_string());
        Ok(())
    }

    /// Deals started for `cid`.
    pub fn deals_for(&self, cid: &ContentId) -> Vec<DealId> {
        self.deals
            .read()
            .iter()
            .filter(|(_, e)| &e.cid == cid)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn deal_count(&self) -> usize {
        self.deals.read().len()
    }

    fn check_online(&self) -> Result<(), DealError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DealError::Unavailable("settlement network offline".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DealSettlement for InMemoryDealSettlement {
    async fn start_deal(&self, cid: &ContentId, size_bytes: u64) -> Result<DealInfo, DealError> {
        self.check_online()?;
        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if size_bytes == 0 {
            return Err(DealError::Rejected("empty payload".into()));
        }

        let deal_id = DealId(format!(
            "deal-{}",
            self.next_id.fetch_add(1, Ordering::SeqCst)
        ));
        self.deals.write().insert(
            deal_id.clone(),
            DealEntry {
                cid: cid.clone(),
                size: size_bytes,
                status: DealStatus::Pending,
            },
        );
        debug!(cid = %cid, deal_id = %deal_id, size = size_bytes, "deal proposed");

        Ok(DealInfo {
            deal_id,
            custodian: self.custodian.clone(),
        })
    }

    async fn deal_status(&self, deal_id: &DealId) -> Result<DealStatus, DealError> {
        self.check_online()?;
        self.deals
            .read()
            .get(deal_id)
            .map(|e| e.status.clone())
            .ok_or_else(|| DealError::UnknownDeal(deal_id.clone()))
    }
}

impl std::fmt::Debug for InMemoryDealSettlement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let deals = self.deals.read();
        let bytes: u64 = deals.values().map(|e| e.size).sum();
        f.debug_struct("InMemoryDealSettlement")
            .field("custodian", &self.custodian)
            .field("deals", &deals.len())
            .field("bytes", &bytes)
            .finish()
    }
}
