//! # Processing Tracker
//!
//! In-memory store of [`ProcessingRequest`]s keyed by request id.
//!
//! Each request sits in its own `DashMap` entry; every mutation goes through
//! the entry's write guard, so concurrent leg updates on one request are
//! serialized and requests on different shards never contend.
//!
//! A content id maps to the legs that make that one record durable: its
//! storage deal and its `AddDocument` ledger leg. Sibling records saved in
//! the same request do not affect each other's visibility.
//!
//! Terminal requests are kept for a retention period so clients can poll
//! their outcome, then dropped by [`ProcessingTracker::remove_finished`].

use crate::domain::{LegKind, LegState, ProcessingError, ProcessingRequest, RequestId, RequestStatus};
use dashmap::DashMap;
use shared_types::{MutationKind, SystemTimeSource, TimeSource, TxHash};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A leg waiting on an external system, as seen by the settlement watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLeg {
    pub request_id: RequestId,
    pub index: usize,
    pub kind: LegKind,
    pub external_id: String,
}

/// Legs of one stored record inside its request.
#[derive(Debug, Clone)]
struct RecordLegs {
    request: RequestId,
    deal: usize,
    ledger: Option<usize>,
}

pub struct ProcessingTracker {
    requests: DashMap<RequestId, ProcessingRequest>,
    /// Content id → legs making that record durable.
    by_content: DashMap<String, RecordLegs>,
    time: Arc<dyn TimeSource>,
}

impl Default for ProcessingTracker {
    fn default() -> Self {
        Self::new(Arc::new(SystemTimeSource))
    }
}

impl ProcessingTracker {
    pub fn new(time: Arc<dyn TimeSource>) -> Self {
        Self {
            requests: DashMap::new(),
            by_content: DashMap::new(),
            time,
        }
    }

    /// Open a new request for `user_id`.
    pub fn start(&self, user_id: &str, ehr_id: Option<&str>) -> RequestId {
        let id = RequestId::generate();
        let request = ProcessingRequest::new(id.clone(), user_id, ehr_id, self.time.now());
        self.requests.insert(id.clone(), request);
        debug!(request_id = %id, user_id, "[gw-03] processing request opened");
        id
    }

    fn with_request<T>(
        &self,
        id: &RequestId,
        f: impl FnOnce(&mut ProcessingRequest) -> T,
    ) -> Result<T, ProcessingError> {
        let mut entry = self
            .requests
            .get_mut(id)
            .ok_or_else(|| ProcessingError::UnknownRequest(id.clone()))?;
        let before = entry.status;
        let out = f(entry.value_mut());
        if entry.status.is_terminal() && entry.finished_at.is_none() {
            entry.finished_at = Some(self.time.now());
        }
        if entry.status != before {
            info!(
                request_id = %id,
                from = ?before,
                to = ?entry.status,
                "[gw-03] processing request status changed"
            );
        }
        Ok(out)
    }

    /// Track a blob that has a deal but no index record of its own.
    pub fn add_deal_leg(
        &self,
        id: &RequestId,
        deal_id: &str,
        content_id: &str,
    ) -> Result<(), ProcessingError> {
        let deal = self.with_request(id, |req| req.add_deal_leg(deal_id, content_id))?;
        self.by_content.insert(
            content_id.to_string(),
            RecordLegs {
                request: id.clone(),
                deal,
                ledger: None,
            },
        );
        Ok(())
    }

    /// Track one stored record: its deal leg plus a reserved `AddDocument`
    /// ledger leg for the batch that will index it.
    pub fn add_record_legs(
        &self,
        id: &RequestId,
        deal_id: &str,
        content_id: &str,
    ) -> Result<(), ProcessingError> {
        let (deal, ledger) = self.with_request(id, |req| {
            let deal = req.add_deal_leg(deal_id, content_id);
            (deal, req.reserve_ledger_leg(MutationKind::AddDocument))
        })?;
        self.by_content.insert(
            content_id.to_string(),
            RecordLegs {
                request: id.clone(),
                deal,
                ledger: Some(ledger),
            },
        );
        Ok(())
    }

    pub fn reserve_ledger_leg(
        &self,
        id: &RequestId,
        kind: MutationKind,
    ) -> Result<(), ProcessingError> {
        self.with_request(id, |req| req.reserve_ledger_leg(kind))
            .map(|_| ())
    }

    pub fn attach_ledger_tx(
        &self,
        id: &RequestId,
        kind: MutationKind,
        tx_hash: &TxHash,
    ) -> Result<(), ProcessingError> {
        let tx = hex::encode(tx_hash);
        self.with_request(id, |req| req.attach_ledger_tx(kind, &tx))
    }

    /// Fail a request whose pipeline stopped before the ledger accepted it.
    pub fn abort(&self, id: &RequestId, reason: &str) -> Result<(), ProcessingError> {
        let (failed, changed) = self.with_request(id, |req| {
            let before = req.status;
            (req.abort(reason), req.status != before)
        })?;
        if changed {
            warn!(request_id = %id, failed, reason, "[gw-03] processing request aborted");
        }
        Ok(())
    }

    pub fn resolve_leg(
        &self,
        id: &RequestId,
        index: usize,
        state: LegState,
    ) -> Result<bool, ProcessingError> {
        self.with_request(id, |req| req.resolve_leg(index, state))
    }

    pub fn status(&self, id: &RequestId) -> Result<RequestStatus, ProcessingError> {
        self.requests
            .get(id)
            .map(|req| req.status)
            .ok_or_else(|| ProcessingError::UnknownRequest(id.clone()))
    }

    pub fn snapshot(&self, id: &RequestId) -> Result<ProcessingRequest, ProcessingError> {
        self.requests
            .get(id)
            .map(|req| req.clone())
            .ok_or_else(|| ProcessingError::UnknownRequest(id.clone()))
    }

    /// True while the deal or the index leg of the record stored under
    /// `content_id` has no outcome yet.
    pub fn is_content_in_flight(&self, content_id: &str) -> bool {
        let Some(legs) = self.by_content.get(content_id).map(|r| r.clone()) else {
            return false;
        };
        self.requests
            .get(&legs.request)
            .map(|req| {
                req.is_leg_open(legs.deal)
                    || legs.ledger.map(|i| req.is_leg_open(i)).unwrap_or(false)
            })
            .unwrap_or(false)
    }

    /// Drop requests that finished at least `retention` ago, with their
    /// content entries. Returns how many requests were removed.
    pub fn remove_finished(&self, retention: Duration) -> usize {
        let now = self.time.now();
        let mut removed = 0;
        self.requests.retain(|id, req| match req.finished_at {
            Some(at) if now.saturating_sub(at) >= retention.as_secs() => {
                debug!(request_id = %id, status = ?req.status, "[gw-03] finished request evicted");
                removed += 1;
                false
            }
            _ => true,
        });
        if removed > 0 {
            self.by_content
                .retain(|_, legs| self.requests.contains_key(&legs.request));
        }
        removed
    }

    /// Legs submitted to an external system and not yet resolved.
    pub fn pending_legs(&self) -> Vec<PendingLeg> {
        let mut out = Vec::new();
        for entry in self.requests.iter() {
            for (index, leg) in entry.legs.iter().enumerate() {
                if leg.state != LegState::Pending {
                    continue;
                }
                if let Some(external_id) = &leg.external_id {
                    out.push(PendingLeg {
                        request_id: entry.id.clone(),
                        index,
                        kind: leg.kind,
                        external_id: external_id.clone(),
                    });
                }
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
