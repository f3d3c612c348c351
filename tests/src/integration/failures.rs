//! # Failure Injection
//!
//! Outbound systems failing partway through a request.
//!
//! | Failure | Expected |
//! |---------|----------|
//! | Content store rejects the second blob | No ledger submission, nothing indexed, request failed |
//! | One deal of a multi-record request fails | Other records stay unreadable until their own legs settle |
//! | Ledger rejects the batch | Request marked failed, retry succeeds |
//! | Deal settlement hangs | Timeout, nothing indexed |
//! | Same user writes concurrently | Both batches land, nonces stay ordered |

#[cfg(test)]
mod tests {
    use crate::harness::{TestGateway, START, SYSTEM};
    use async_trait::async_trait;
    use gateway_runtime::GatewayConfig;
    use gw_01_content_storage::{
        ContentError, ContentId, ContentStore, DealId, InMemoryContentStore,
        InMemoryDealSettlement,
    };
    use gw_02_index_ledger::{InMemoryLedger, IndexClient};
    use gw_03_processing::{LegKind, ProcessingTracker, RequestStatus, SettlementWatcher};
    use gw_04_document_service::{
        Composition, DocumentPipeline, DocumentServiceConfig, EhrService, InMemoryKeystore,
        RequestContext,
    };
    use serde_json::json;
    use shared_types::{ErrorKind, ManualTimeSource};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Accepts `healthy` blobs, then refuses every later one.
    struct FlakyContentStore {
        inner: InMemoryContentStore,
        healthy: usize,
        calls: AtomicUsize,
    }

    impl FlakyContentStore {
        fn new(healthy: usize) -> Self {
            Self {
                inner: InMemoryContentStore::new(),
                healthy,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ContentStore for FlakyContentStore {
        async fn add(&self, bytes: Vec<u8>) -> Result<ContentId, ContentError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.healthy {
                return Err(ContentError::Unavailable("disk quota exceeded".into()));
            }
            self.inner.add(bytes).await
        }

        async fn fetch(&self, cid: &ContentId) -> Result<Vec<u8>, ContentError> {
            self.inner.fetch(cid).await
        }
    }

    // =========================================================================
    // BATCH ATOMICITY
    // =========================================================================

    #[tokio::test]
    async fn test_content_failure_mid_request_commits_nothing() {
        let ledger = Arc::new(InMemoryLedger::new());
        let content = Arc::new(FlakyContentStore::new(1));
        let deals = Arc::new(InMemoryDealSettlement::default());
        let time = Arc::new(ManualTimeSource::new(START));
        let tracker = Arc::new(ProcessingTracker::new(time.clone()));
        let watcher = SettlementWatcher::new(tracker.clone(), deals.clone(), ledger.clone());
        let pipeline = Arc::new(DocumentPipeline::new(
            IndexClient::new(ledger.clone()),
            content.clone(),
            deals.clone(),
            tracker.clone(),
            Arc::new(InMemoryKeystore::new()),
            time,
            DocumentServiceConfig {
                system_id: SYSTEM.to_string(),
                ..Default::default()
            },
        ));
        let ehr = EhrService::new(pipeline);
        let ctx = RequestContext::new("U", SYSTEM);

        // The EHR blob is stored, the EHR_STATUS blob is refused.
        let err = ehr.create_ehr(&ctx, "S1", "ns").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal, "{err}");
        assert_eq!(content.calls.load(Ordering::SeqCst), 2);
        assert_eq!(ledger.submission_count(), 0);

        let lookup = ehr.get_ehr_id_by_user(&ctx).await.unwrap_err();
        assert_eq!(lookup.kind(), ErrorKind::NotFound);

        // The stored EHR blob left a deal leg behind; the request is failed
        // and stays failed once that deal settles.
        let legs = tracker.pending_legs();
        assert_eq!(legs.len(), 1);
        let request = legs[0].request_id.clone();
        assert_eq!(tracker.status(&request).unwrap(), RequestStatus::Failed);

        deals.settle_all();
        ledger.confirm_all();
        watcher.sync_once().await;
        assert_eq!(tracker.status(&request).unwrap(), RequestStatus::Failed);
        assert!(tracker.pending_legs().is_empty());
    }

    // =========================================================================
    // PER-RECORD SETTLEMENT
    // =========================================================================

    #[tokio::test]
    async fn test_failed_sibling_deal_does_not_expose_unsettled_record() {
        let t = TestGateway::new();
        let ctx = t.ctx("U");
        let created = t.gateway.create_ehr(&ctx, "S1", "ns", None).await.unwrap();

        // Legs: EHR deal, EHR index, status deal, status index, user, subject.
        let request = t.gateway.request(&created.request_id).unwrap();
        assert_eq!(request.legs[2].kind, LegKind::FilecoinDeal);
        let status_deal = DealId(request.legs[2].external_id.clone().unwrap());
        t.container()
            .deals
            .fail_deal(&status_deal, "custodian offline")
            .unwrap();
        t.container().watcher.sync_once().await;
        assert_eq!(
            t.gateway.request_status(&created.request_id).unwrap(),
            RequestStatus::Failed
        );

        let early = t.gateway.get_ehr(&ctx, &created.ehr_id).await.unwrap_err();
        assert_eq!(early.kind(), ErrorKind::StillProcessing);

        t.settle().await;
        let (ehr, _) = t.gateway.get_ehr(&ctx, &created.ehr_id).await.unwrap();
        assert_eq!(ehr.ehr_id, created.ehr_id);
    }

    // =========================================================================
    // LEDGER REJECTION
    // =========================================================================

    #[tokio::test]
    async fn test_rejected_batch_fails_request_and_retry_succeeds() {
        let t = TestGateway::new();
        let ctx = t.ctx("U");
        t.container().ledger.fail_next_submit("nonce too low");

        let err = t
            .gateway
            .create_ehr(&ctx, "S1", "ns", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(t.container().ledger.submission_count(), 0);

        // Only the deal legs of the failed request are still outstanding.
        let legs = t.container().tracker.pending_legs();
        assert!(!legs.is_empty());
        assert!(legs.iter().all(|l| l.kind == LegKind::FilecoinDeal));
        let failed = t.gateway.request(&legs[0].request_id).unwrap();
        assert_eq!(failed.status, RequestStatus::Failed);

        let lookup = t.gateway.get_ehr_id_by_user(&ctx).await.unwrap_err();
        assert_eq!(lookup.kind(), ErrorKind::NotFound);

        let created = t.gateway.create_ehr(&ctx, "S1", "ns", None).await.unwrap();
        assert_eq!(t.container().ledger.submission_count(), 1);
        t.settle().await;
        assert_eq!(
            t.gateway.request_status(&created.request_id).unwrap(),
            RequestStatus::Done
        );
    }

    // =========================================================================
    // TIMEOUTS
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_hanging_deal_times_out() {
        let t = TestGateway::with_config(GatewayConfig {
            system_id: SYSTEM.to_string(),
            external_timeout_secs: 2,
            ..Default::default()
        });
        t.container().deals.set_delay(Some(Duration::from_secs(120)));
        let ctx = t.ctx("U");

        let err = t
            .gateway
            .create_ehr(&ctx, "S1", "ns", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(t.container().ledger.submission_count(), 0);

        // A caller-supplied bound wins over the configured one.
        t.container().deals.set_delay(None);
        let quick = ctx.with_timeout(Duration::from_secs(1));
        t.gateway.create_ehr(&quick, "S1", "ns", None).await.unwrap();
    }

    // =========================================================================
    // CONCURRENCY
    // =========================================================================

    #[tokio::test]
    async fn test_concurrent_writes_by_one_user_both_land() {
        let t = TestGateway::new();
        let ctx = t.ctx("U");
        let created = t.gateway.create_ehr(&ctx, "S1", "ns", None).await.unwrap();
        t.settle().await;
        let before = t.container().ledger.submission_count();

        let (a, b) = tokio::join!(
            t.gateway.create_composition(
                &ctx,
                &created.ehr_id,
                Composition::new("Morning", json!({"t": 36.6}))
            ),
            t.gateway.create_composition(
                &ctx,
                &created.ehr_id,
                Composition::new("Evening", json!({"t": 37.1}))
            ),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.id.uid(), b.id.uid());
        assert_eq!(t.container().ledger.submission_count(), before + 2);

        t.settle().await;
        let mut names: Vec<String> = t
            .gateway
            .list_compositions(&ctx, &created.ehr_id)
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["Evening".to_string(), "Morning".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_writes_by_different_users_are_independent() {
        let t = TestGateway::new();
        let users = ["U1", "U2", "U3", "U4"];
        let creates = users.iter().map(|user| {
            let gateway = t.gateway.clone();
            let ctx = t.ctx(user);
            tokio::spawn(async move {
                gateway
                    .create_ehr(&ctx, &format!("subject-{}", ctx.user_id), "ns", None)
                    .await
            })
        });
        for handle in creates.collect::<Vec<_>>() {
            handle.await.unwrap().unwrap();
        }
        t.settle().await;

        for user in users {
            let ctx = t.ctx(user);
            let ehr_id = t.gateway.get_ehr_id_by_user(&ctx).await.unwrap();
            let (ehr, _) = t.gateway.get_ehr(&ctx, &ehr_id).await.unwrap();
            assert_eq!(ehr.ehr_id, ehr_id);
        }
    }
}
