//! # End-to-End Scenarios
//!
//! | Scenario | Flow |
//! |----------|------|
//! | A | New user creates an EHR for subject S1@ns on SYS1 |
//! | B | Status update with the current version as precondition |
//! | C | Status update with a stale precondition |
//! | D | Read before and after settlement |
//! | E | Delete a composition, then read the deleted version |

#[cfg(test)]
mod tests {
    use crate::harness::{TestGateway, START, SYSTEM};
    use gateway_runtime::DocumentRef;
    use gw_03_processing::RequestStatus;
    use gw_04_document_service::{Composition, EhrStatus};
    use serde_json::json;
    use shared_types::{ErrorKind, GatewayError, VersionedId};

    // =========================================================================
    // SCENARIO A
    // =========================================================================

    #[tokio::test]
    async fn test_scenario_a_create_ehr_for_new_user() {
        let t = TestGateway::new();
        let ctx = t.ctx("U");

        let created = t.gateway.create_ehr(&ctx, "S1", "ns", None).await.unwrap();
        let id_string = created.status_id.to_string();
        let parts: Vec<&str> = id_string.split("::").collect();
        assert_eq!(parts.len(), 3);
        assert!(uuid::Uuid::parse_str(parts[0]).is_ok());
        assert_eq!(parts[1], SYSTEM);
        assert_eq!(parts[2], "1");

        t.settle().await;
        let (status, latest) = t
            .gateway
            .get_status(&ctx, DocumentRef::Latest(created.ehr_id.clone()))
            .await
            .unwrap();
        let subject = status.subject_ref().unwrap();
        assert_eq!((subject.id.as_str(), subject.namespace.as_str()), ("S1", "ns"));
        assert_eq!(latest, created.status_id);

        assert_eq!(t.gateway.get_ehr_id_by_user(&ctx).await.unwrap(), created.ehr_id);
        let (ehr, _) = t.gateway.get_ehr_by_subject(&ctx, "S1", "ns").await.unwrap();
        assert_eq!(ehr.system_id, SYSTEM);
    }

    // =========================================================================
    // SCENARIOS B AND C
    // =========================================================================

    #[tokio::test]
    async fn test_scenario_b_and_c_status_preconditions() {
        let t = TestGateway::new();
        let ctx = t.ctx("U");
        let created = t.gateway.create_ehr(&ctx, "S1", "ns", None).await.unwrap();
        t.settle().await;
        let v1 = created.status_id.to_string();

        let mut status = EhrStatus::new("", "S1", "ns");
        status.is_queryable = false;
        let v2 = t
            .gateway
            .update_status(&ctx, &created.ehr_id, &v1, status.clone())
            .await
            .unwrap();
        assert_eq!(v2.id.version(), 2);
        assert_eq!(v2.id.uid(), created.status_id.uid());
        t.settle().await;

        let stale = t
            .gateway
            .update_status(&ctx, &created.ehr_id, &v1, status)
            .await
            .unwrap_err();
        assert_eq!(
            stale,
            GatewayError::PreconditionFailed {
                current: v2.id.to_string()
            }
        );

        // The reported version is good for a retry.
        let v3 = t
            .gateway
            .update_status(&ctx, &created.ehr_id, &v2.id.to_string(), EhrStatus::new("", "S1", "ns"))
            .await
            .unwrap();
        assert_eq!(v3.id.version(), 3);
    }

    #[tokio::test]
    async fn test_scenario_c_precondition_from_another_document() {
        let t = TestGateway::new();
        let ctx = t.ctx("U");
        let created = t.gateway.create_ehr(&ctx, "S1", "ns", None).await.unwrap();
        t.settle().await;

        let foreign = VersionedId::new("some-other-uid", SYSTEM, 1).unwrap();
        let err = t
            .gateway
            .update_status(&ctx, &created.ehr_id, &foreign.to_string(), EhrStatus::new("", "S1", "ns"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            GatewayError::PreconditionFailed {
                current: created.status_id.to_string()
            }
        );
    }

    // =========================================================================
    // SCENARIO D
    // =========================================================================

    #[tokio::test]
    async fn test_scenario_d_read_before_and_after_settlement() {
        let t = TestGateway::new();
        let ctx = t.ctx("U");
        let created = t.gateway.create_ehr(&ctx, "S1", "ns", None).await.unwrap();

        let early = t
            .gateway
            .get_status(&ctx, DocumentRef::Latest(created.ehr_id.clone()))
            .await
            .unwrap_err();
        assert_eq!(early.kind(), ErrorKind::StillProcessing);
        assert_eq!(
            t.gateway.request_status(&created.request_id).unwrap(),
            RequestStatus::Processing
        );

        // Ledger confirmed but deals still open: content is not durable yet.
        t.container().ledger.confirm_all();
        t.container().watcher.sync_once().await;
        let still = t
            .gateway
            .get_ehr(&ctx, &created.ehr_id)
            .await
            .unwrap_err();
        assert_eq!(still.kind(), ErrorKind::StillProcessing);

        let report = t.settle().await;
        assert!(report.settled > 0);
        assert_eq!(
            t.gateway.request_status(&created.request_id).unwrap(),
            RequestStatus::Done
        );
        let (ehr, _) = t.gateway.get_ehr(&ctx, &created.ehr_id).await.unwrap();
        assert_eq!(ehr.ehr_id, created.ehr_id);
    }

    #[tokio::test]
    async fn test_scenario_d_missing_is_not_processing() {
        let t = TestGateway::new();
        let err = t
            .gateway
            .get_ehr(&t.ctx("U"), "never-created")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    // =========================================================================
    // SCENARIO E
    // =========================================================================

    #[tokio::test]
    async fn test_scenario_e_deleted_version_reads_as_deleted() {
        let t = TestGateway::new();
        let ctx = t.ctx("U");
        let created = t.gateway.create_ehr(&ctx, "S1", "ns", None).await.unwrap();
        t.settle().await;

        let saved = t
            .gateway
            .create_composition(&ctx, &created.ehr_id, Composition::new("Vitals", json!({"bp": "120/80"})))
            .await
            .unwrap();
        t.settle().await;

        let outcome = t
            .gateway
            .delete_composition(&ctx, &created.ehr_id, &saved.id.to_string())
            .await
            .unwrap();
        assert_eq!(outcome.next_version.uid(), saved.id.uid());
        assert_eq!(outcome.next_version.version(), 2);

        let err = t
            .gateway
            .get_composition(&ctx, DocumentRef::Version(saved.id.to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyDeleted);

        // No record exists for the advisory next version.
        let next = t
            .gateway
            .get_composition(&ctx, DocumentRef::Version(outcome.next_version.to_string()))
            .await
            .unwrap_err();
        assert_eq!(next.kind(), ErrorKind::NotFound);

        assert!(t
            .gateway
            .list_compositions(&ctx, &created.ehr_id)
            .await
            .unwrap()
            .is_empty());
    }

    // =========================================================================
    // TIME TRAVEL
    // =========================================================================

    #[tokio::test]
    async fn test_composition_read_at_time() {
        let t = TestGateway::new();
        let ctx = t.ctx("U");
        let created = t.gateway.create_ehr(&ctx, "S1", "ns", None).await.unwrap();
        let v1 = t
            .gateway
            .create_composition(&ctx, &created.ehr_id, Composition::new("Weight", json!({"kg": 80})))
            .await
            .unwrap();
        t.settle().await;

        t.time.advance(86_400);
        let v2 = t
            .gateway
            .update_composition(
                &ctx,
                &created.ehr_id,
                &v1.id.to_string(),
                Composition::new("Weight", json!({"kg": 78})),
            )
            .await
            .unwrap();
        t.settle().await;

        let uid = v1.id.uid().to_string();
        let (old, old_id) = t
            .gateway
            .get_composition(&ctx, DocumentRef::AtTime(uid.clone(), (START + 3_600) as u32))
            .await
            .unwrap();
        assert_eq!(old.content, json!({"kg": 80}));
        assert_eq!(old_id, v1.id);

        let (latest, latest_id) = t
            .gateway
            .get_composition(&ctx, DocumentRef::Latest(uid))
            .await
            .unwrap();
        assert_eq!(latest.content, json!({"kg": 78}));
        assert_eq!(latest_id, v2.id);
    }
}
