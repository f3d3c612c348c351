//! # Cross-Crate Properties
//!
//! Invariants that must hold for any input, checked over randomized ids
//! and through the full gateway wiring.

#[cfg(test)]
mod tests {
    use crate::harness::{TestGateway, SYSTEM};
    use gateway_runtime::DocumentRef;
    use gw_04_document_service::{Composition, EhrStatus};
    use rand::{distributions::Alphanumeric, Rng};
    use serde_json::json;
    use shared_crypto::DocumentKey;
    use shared_types::{base_identity_of, ErrorKind, VersionedId};

    fn random_token(rng: &mut impl Rng, len: usize) -> String {
        rng.sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }

    // =========================================================================
    // VERSIONED IDS
    // =========================================================================

    #[test]
    fn test_versioned_id_text_form_round_trips() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let uid = uuid::Uuid::new_v4().to_string();
            let authority = format!("{}.ehr", random_token(&mut rng, 8));
            let version = rng.gen_range(1..u32::MAX as u64);

            let id = VersionedId::new(uid.as_str(), authority.as_str(), version).unwrap();
            let parsed = VersionedId::parse(&id.to_string(), &authority).unwrap();
            assert_eq!(parsed, id);
            assert_eq!(parsed.uid(), uid);
            assert_eq!(parsed.version(), version);
            assert_eq!(parsed.base_identity(), base_identity_of(&uid));
        }
    }

    #[test]
    fn test_base_identity_ignores_version() {
        let id = VersionedId::generate(SYSTEM).unwrap();
        let next = id.increase_version().unwrap().increase_version().unwrap();
        assert_eq!(next.version(), id.version() + 2);
        assert_eq!(next.uid(), id.uid());
        assert_eq!(next.base_identity(), id.base_identity());
        assert_ne!(next.version_bytes(), id.version_bytes());
    }

    #[test]
    fn test_malformed_ids_are_format_errors() {
        for bad in ["", "abc", "abc::SYS1", "abc::SYS1::x", "::SYS1::1", "abc::SYS1::1::2"] {
            let err = VersionedId::parse(bad, SYSTEM).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Format, "{bad:?}");
        }
    }

    // =========================================================================
    // ENVELOPES
    // =========================================================================

    #[test]
    fn test_envelope_is_bound_to_its_identity() {
        let key = DocumentKey::generate();
        let id = VersionedId::generate(SYSTEM).unwrap();
        let other = id.increase_version().unwrap();

        let sealed = key
            .encrypt_with_auth_data(b"{\"bp\":\"120/80\"}", id.to_string().as_bytes())
            .unwrap();
        assert!(key
            .decrypt_with_auth_data(&sealed, other.to_string().as_bytes())
            .is_err());
        assert!(DocumentKey::generate()
            .decrypt_with_auth_data(&sealed, id.to_string().as_bytes())
            .is_err());
        assert_eq!(
            key.decrypt_with_auth_data(&sealed, id.to_string().as_bytes())
                .unwrap(),
            b"{\"bp\":\"120/80\"}"
        );
    }

    // =========================================================================
    // UNIQUENESS AND TOMBSTONES
    // =========================================================================

    #[tokio::test]
    async fn test_duplicate_version_is_rejected_without_side_effects() {
        let t = TestGateway::new();
        let ctx = t.ctx("U");
        let created = t.gateway.create_ehr(&ctx, "S1", "ns", None).await.unwrap();
        t.settle().await;

        let mut comp = Composition::new("Vitals", json!({"hr": 60}));
        let saved = t
            .gateway
            .create_composition(&ctx, &created.ehr_id, comp.clone())
            .await
            .unwrap();
        let stored = t.container().content.len();
        let submissions = t.container().ledger.submission_count();

        comp.uid = saved.id.to_string();
        let err = t
            .gateway
            .create_composition(&ctx, &created.ehr_id, comp)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(t.container().content.len(), stored);
        assert_eq!(t.container().ledger.submission_count(), submissions);
    }

    #[tokio::test]
    async fn test_deleted_document_stays_deleted() {
        let t = TestGateway::new();
        let ctx = t.ctx("U");
        let created = t.gateway.create_ehr(&ctx, "S1", "ns", None).await.unwrap();
        let saved = t
            .gateway
            .create_composition(&ctx, &created.ehr_id, Composition::new("Note", json!({})))
            .await
            .unwrap();
        t.settle().await;
        let v1 = saved.id.to_string();
        t.gateway
            .delete_composition(&ctx, &created.ehr_id, &v1)
            .await
            .unwrap();
        t.settle().await;

        let again = t
            .gateway
            .delete_composition(&ctx, &created.ehr_id, &v1)
            .await
            .unwrap_err();
        assert_eq!(again.kind(), ErrorKind::AlreadyDeleted);

        let update = t
            .gateway
            .update_composition(&ctx, &created.ehr_id, &v1, Composition::new("Note", json!({})))
            .await
            .unwrap_err();
        assert_eq!(update.kind(), ErrorKind::AlreadyDeleted);

        let latest = t
            .gateway
            .get_composition(&ctx, DocumentRef::Latest(saved.id.uid().to_string()))
            .await
            .unwrap_err();
        assert_eq!(latest.kind(), ErrorKind::AlreadyDeleted);
    }

    // =========================================================================
    // PRIVACY
    // =========================================================================

    #[tokio::test]
    async fn test_documents_are_private_to_their_owner() {
        let t = TestGateway::new();
        let owner = t.ctx("U");
        let created = t.gateway.create_ehr(&owner, "S1", "ns", None).await.unwrap();
        t.settle().await;

        let stranger = t.ctx("V");
        let err = t
            .gateway
            .get_ehr(&stranger, &created.ehr_id)
            .await
            .unwrap_err();
        assert!(
            matches!(err.kind(), ErrorKind::Encryption | ErrorKind::AccessDenied),
            "{err}"
        );

        let status = t
            .gateway
            .update_status(
                &stranger,
                &created.ehr_id,
                &created.status_id.to_string(),
                EhrStatus::new("", "S2", "ns"),
            )
            .await;
        assert!(status.is_err());
    }

    #[tokio::test]
    async fn test_one_ehr_per_user() {
        let t = TestGateway::new();
        let ctx = t.ctx("U");
        t.gateway.create_ehr(&ctx, "S1", "ns", None).await.unwrap();
        let err = t
            .gateway
            .create_ehr(&ctx, "S2", "ns", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }
}
