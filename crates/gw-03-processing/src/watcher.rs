//! # Settlement Watcher
//!
//! Background task that polls the deal network and the ledger for every
//! pending leg and records terminal outcomes in the tracker.
//!
//! A leg whose status query fails is left pending and asked again on the
//! next tick. Failed legs are never resubmitted.
//!
//! Each tick also evicts requests that finished longer than the retention
//! period ago.

use crate::domain::{LegKind, LegState};
use crate::tracker::{PendingLeg, ProcessingTracker};
use gw_01_content_storage::{DealId, DealSettlement, DealStatus};
use gw_02_index_ledger::{LedgerTransport, TxStatus};
use shared_types::TxHash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How long a finished request stays pollable by default.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(3600);

/// Outcome of one polling pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub checked: usize,
    pub settled: usize,
    pub failed: usize,
}

pub struct SettlementWatcher {
    tracker: Arc<ProcessingTracker>,
    deals: Arc<dyn DealSettlement>,
    ledger: Arc<dyn LedgerTransport>,
    retention: Duration,
}

impl SettlementWatcher {
    pub fn new(
        tracker: Arc<ProcessingTracker>,
        deals: Arc<dyn DealSettlement>,
        ledger: Arc<dyn LedgerTransport>,
    ) -> Self {
        Self {
            tracker,
            deals,
            ledger,
            retention: DEFAULT_RETENTION,
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Evict finished requests older than the retention period.
    pub fn cleanup(&self) -> usize {
        let removed = self.tracker.remove_finished(self.retention);
        if removed > 0 {
            debug!(removed, "[gw-03] cleaned up finished requests");
        }
        removed
    }

    /// Poll every pending leg once.
    pub async fn sync_once(&self) -> SyncReport {
        let mut report = SyncReport::default();
        for leg in self.tracker.pending_legs() {
            report.checked += 1;
            let Some(state) = self.poll(&leg).await else {
                continue;
            };
            let failed = matches!(state, LegState::Failed(_));
            match self.tracker.resolve_leg(&leg.request_id, leg.index, state) {
                Ok(true) if failed => report.failed += 1,
                Ok(true) => report.settled += 1,
                Ok(false) => {}
                Err(e) => warn!(error = %e, "[gw-03] leg vanished while resolving"),
            }
        }
        if report.checked > 0 {
            debug!(
                checked = report.checked,
                settled = report.settled,
                failed = report.failed,
                "[gw-03] settlement pass finished"
            );
        }
        report
    }

    /// Terminal state of a leg, or `None` while it is still pending.
    async fn poll(&self, leg: &PendingLeg) -> Option<LegState> {
        match leg.kind {
            LegKind::FilecoinDeal => {
                let deal_id = DealId(leg.external_id.clone());
                match self.deals.deal_status(&deal_id).await {
                    Ok(DealStatus::Active) => Some(LegState::Done),
                    Ok(DealStatus::Failed(reason)) => Some(LegState::Failed(reason)),
                    Ok(DealStatus::Pending) => None,
                    Err(e) => {
                        warn!(deal_id = %deal_id, error = %e, "[gw-03] deal status query failed");
                        None
                    }
                }
            }
            LegKind::LedgerTx(_) => {
                let Some(tx_hash) = parse_tx_hash(&leg.external_id) else {
                    return Some(LegState::Failed(format!(
                        "malformed tx hash {}",
                        leg.external_id
                    )));
                };
                match self.ledger.tx_status(&tx_hash).await {
                    Ok(TxStatus::Confirmed) => Some(LegState::Done),
                    Ok(TxStatus::Failed(reason)) => Some(LegState::Failed(reason)),
                    Ok(TxStatus::Pending) => None,
                    Err(e) => {
                        warn!(tx_hash = %leg.external_id, error = %e, "[gw-03] tx status query failed");
                        None
                    }
                }
            }
        }
    }

    /// Run `sync_once` and `cleanup` every `period` until `shutdown` flips
    /// to true.
    pub fn spawn(self: Arc<Self>, period: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            info!(period_secs = period.as_secs(), "[gw-03] settlement watcher started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sync_once().await;
                        self.cleanup();
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("[gw-03] settlement watcher stopped");
        })
    }
}

fn parse_tx_hash(hex_hash: &str) -> Option<TxHash> {
    hex::decode(hex_hash).ok()?.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_01_content_storage::{ContentId, InMemoryDealSettlement};
    use gw_02_index_ledger::{IndexCall, InMemoryLedger, IndexClient};
    use shared_types::{ManualTimeSource, MutationKind};
    use crate::domain::RequestStatus;

    struct Harness {
        tracker: Arc<ProcessingTracker>,
        deals: Arc<InMemoryDealSettlement>,
        ledger: Arc<InMemoryLedger>,
        watcher: Arc<SettlementWatcher>,
    }

    fn harness() -> Harness {
        let tracker = Arc::new(ProcessingTracker::default());
        let deals = Arc::new(InMemoryDealSettlement::new("f01000"));
        let ledger = Arc::new(InMemoryLedger::new());
        let watcher = Arc::new(SettlementWatcher::new(
            tracker.clone(),
            deals.clone(),
            ledger.clone(),
        ));
        Harness {
            tracker,
            deals,
            ledger,
            watcher,
        }
    }

    async fn submit_one(ledger: &Arc<InMemoryLedger>) -> TxHash {
        let client = IndexClient::new(ledger.clone());
        client
            .send_single(
                &[0x31; 32],
                IndexCall::SetUser {
                    user_key: [1u8; 32],
                    ehr_id: "ehr-1".into(),
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_request_settles_after_deal_and_tx() {
        let h = harness();
        let cid = ContentId::for_bytes(b"ciphertext");
        let deal = h.deals.start_deal(&cid, 10).await.unwrap();
        let tx = submit_one(&h.ledger).await;

        let id = h.tracker.start("u1", None);
        h.tracker.add_deal_leg(&id, &deal.deal_id.0, cid.as_str()).unwrap();
        h.tracker.attach_ledger_tx(&id, MutationKind::SetUser, &tx).unwrap();

        let report = h.watcher.sync_once().await;
        assert_eq!(report, SyncReport { checked: 2, settled: 0, failed: 0 });
        assert_eq!(h.tracker.status(&id).unwrap(), RequestStatus::Processing);

        h.deals.settle_all();
        h.ledger.confirm_all();
        let report = h.watcher.sync_once().await;
        assert_eq!(report.settled, 2);
        assert_eq!(h.tracker.status(&id).unwrap(), RequestStatus::Done);
        assert!(!h.tracker.is_content_in_flight(cid.as_str()));
    }

    #[tokio::test]
    async fn test_failed_deal_fails_request() {
        let h = harness();
        let cid = ContentId::for_bytes(b"other");
        let deal = h.deals.start_deal(&cid, 5).await.unwrap();
        let id = h.tracker.start("u1", None);
        h.tracker.add_deal_leg(&id, &deal.deal_id.0, cid.as_str()).unwrap();

        h.deals.fail_deal(&deal.deal_id, "custodian slashed").unwrap();
        let report = h.watcher.sync_once().await;
        assert_eq!(report.failed, 1);
        assert_eq!(h.tracker.status(&id).unwrap(), RequestStatus::Failed);
    }

    #[tokio::test]
    async fn test_unreachable_network_leaves_leg_pending() {
        let h = harness();
        let cid = ContentId::for_bytes(b"x");
        let deal = h.deals.start_deal(&cid, 1).await.unwrap();
        let id = h.tracker.start("u1", None);
        h.tracker.add_deal_leg(&id, &deal.deal_id.0, cid.as_str()).unwrap();

        h.deals.set_offline(true);
        let report = h.watcher.sync_once().await;
        assert_eq!(report.settled + report.failed, 0);
        assert_eq!(h.tracker.pending_legs().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_watcher_stops_on_shutdown() {
        let h = harness();
        let cid = ContentId::for_bytes(b"y");
        let deal = h.deals.start_deal(&cid, 1).await.unwrap();
        let id = h.tracker.start("u1", None);
        h.tracker.add_deal_leg(&id, &deal.deal_id.0, cid.as_str()).unwrap();
        h.deals.settle_all();

        let (tx, rx) = watch::channel(false);
        let handle = h.watcher.clone().spawn(Duration::from_secs(5), rx);
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(h.tracker.status(&id).unwrap(), RequestStatus::Done);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_cleanup_drops_requests_past_retention() {
        let time = Arc::new(ManualTimeSource::new(1_700_000_000));
        let tracker = Arc::new(ProcessingTracker::new(time.clone()));
        let deals = Arc::new(InMemoryDealSettlement::new("f01000"));
        let watcher = SettlementWatcher::new(
            tracker.clone(),
            deals.clone(),
            Arc::new(InMemoryLedger::new()),
        )
        .with_retention(Duration::from_secs(600));

        let cid = ContentId::for_bytes(b"z");
        let deal = deals.start_deal(&cid, 1).await.unwrap();
        let id = tracker.start("u1", None);
        tracker.add_deal_leg(&id, &deal.deal_id.0, cid.as_str()).unwrap();
        deals.settle_all();
        watcher.sync_once().await;
        assert_eq!(tracker.status(&id).unwrap(), RequestStatus::Done);

        assert_eq!(watcher.cleanup(), 0);
        time.advance(600);
        assert_eq!(watcher.cleanup(), 1);
        assert!(tracker.is_empty());
    }
}
