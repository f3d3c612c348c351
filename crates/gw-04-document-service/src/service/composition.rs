//! # Composition Service
//!
//! Versioned clinical compositions scoped to an EHR.
//!
//! | Operation | Index effect |
//! |-----------|--------------|
//! | `create` | AddDocument v1 |
//! | `update` | AddDocument v(n+1) after an If-Match check against vn |
//! | `delete` | DeleteDocument on vn, sent on its own |
//!
//! A delete writes no new record. The returned next version id is advisory.

use super::{ehr_scope, rfc3339};
use crate::domain::{Composition, DeleteOutcome, DocumentItem, RequestContext, SavedDocument};
use crate::pipeline::{DocumentPipeline, ReadTarget, SaveTarget};
use crate::ports::UserKeys;
use gw_03_processing::RequestId;
use shared_types::{
    base_identity_of, AttributeCode, DocumentKind, GatewayError, MutationKind, VersionedId,
};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct CompositionService {
    pipeline: Arc<DocumentPipeline>,
}

impl CompositionService {
    pub fn new(pipeline: Arc<DocumentPipeline>) -> Self {
        Self { pipeline }
    }

    /// Save the first version of a composition in `ehr_id`.
    ///
    /// A non-empty `comp.uid` is taken as the id to save under; otherwise a
    /// fresh one is generated.
    #[instrument(skip(self, ctx, comp), fields(user_id = %ctx.user_id))]
    pub async fn create(
        &self,
        ctx: &RequestContext,
        ehr_id: &str,
        mut comp: Composition,
    ) -> Result<SavedDocument, GatewayError> {
        let authority = self.pipeline.authority(ctx).to_string();
        let id = if comp.uid.is_empty() {
            VersionedId::generate(&authority)?
        } else {
            VersionedId::parse(&comp.uid, &authority)?
        };

        self.pipeline
            .index()
            .get_last_by_base(DocumentKind::Ehr, base_identity_of(ehr_id))
            .await
            .map_err(|e| GatewayError::from(e).context(format!("EHR {ehr_id}")))?;

        comp.uid = id.to_string();
        let keys = self.pipeline.keys(ctx).await?;
        let request = self.save(ctx, &keys, ehr_id, &id, &comp).await?;
        info!(ehr_id, version_id = %id, request_id = %request, "[gw-04] composition created");
        Ok(SavedDocument {
            id,
            request_id: request,
        })
    }

    /// Save a new version if `preceding_version_id` is the current one.
    #[instrument(skip(self, ctx, comp), fields(user_id = %ctx.user_id))]
    pub async fn update(
        &self,
        ctx: &RequestContext,
        ehr_id: &str,
        preceding_version_id: &str,
        mut comp: Composition,
    ) -> Result<SavedDocument, GatewayError> {
        let preceding = VersionedId::parse(preceding_version_id, self.pipeline.authority(ctx))?;
        let keys = self.pipeline.keys(ctx).await?;
        let current = self
            .pipeline
            .check_precondition(ctx, &keys, DocumentKind::Composition, &preceding)
            .await?;

        let next = current.increase_version()?;
        comp.uid = next.to_string();
        let request = self.save(ctx, &keys, ehr_id, &next, &comp).await?;
        info!(ehr_id, version_id = %next, request_id = %request, "[gw-04] composition updated");
        Ok(SavedDocument {
            id: next,
            request_id: request,
        })
    }

    async fn save(
        &self,
        ctx: &RequestContext,
        keys: &UserKeys,
        ehr_id: &str,
        id: &VersionedId,
        comp: &Composition,
    ) -> Result<RequestId, GatewayError> {
        let request = self.pipeline.tracker().start(&ctx.user_id, Some(ehr_id));
        async {
            let mut batch = self.pipeline.index().new_batch(&keys.private_key).await?;
            let target = SaveTarget {
                scope: ehr_scope(ehr_id),
                id,
                request: &request,
            };
            self.pipeline
                .save(ctx, keys, &mut batch, target, comp)
                .await
                .map_err(|e| e.context(format!("COMPOSITION {id}")))?;
            self.pipeline.commit(batch, &request).await
        }
        .await
        .map_err(|e| self.pipeline.abort(&request, e))?;
        Ok(request)
    }

    pub async fn get_by_version(
        &self,
        ctx: &RequestContext,
        version_id: &str,
    ) -> Result<Composition, GatewayError> {
        let id = VersionedId::parse(version_id, self.pipeline.authority(ctx))?;
        let (comp, _) = self
            .pipeline
            .read::<Composition>(ctx, ReadTarget::Version(id))
            .await?;
        Ok(comp)
    }

    /// Last version of the composition with logical id `uid`.
    pub async fn get_latest(
        &self,
        ctx: &RequestContext,
        uid: &str,
    ) -> Result<(Composition, VersionedId), GatewayError> {
        self.pipeline
            .read::<Composition>(ctx, ReadTarget::Latest(base_identity_of(uid)))
            .await
    }

    pub async fn get_at_time(
        &self,
        ctx: &RequestContext,
        uid: &str,
        at: u32,
    ) -> Result<(Composition, VersionedId), GatewayError> {
        self.pipeline
            .read::<Composition>(ctx, ReadTarget::AtTime(base_identity_of(uid), at))
            .await
    }

    /// Tombstone the current version. `preceding_version_id` must name it.
    #[instrument(skip(self, ctx), fields(user_id = %ctx.user_id))]
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        ehr_id: &str,
        preceding_version_id: &str,
    ) -> Result<DeleteOutcome, GatewayError> {
        let preceding = VersionedId::parse(preceding_version_id, self.pipeline.authority(ctx))?;
        let keys = self.pipeline.keys(ctx).await?;
        let current = self
            .pipeline
            .check_precondition(ctx, &keys, DocumentKind::Composition, &preceding)
            .await?;

        let request = self.pipeline.tracker().start(&ctx.user_id, Some(ehr_id));
        let tx_hash = match self
            .pipeline
            .index()
            .delete_document(
                DocumentKind::Composition,
                current.base_identity(),
                current.version_bytes(),
                &keys.private_key,
            )
            .await
        {
            Ok(tx_hash) => tx_hash,
            Err(e) => {
                let err = GatewayError::from(e).context(format!("delete COMPOSITION {current}"));
                return Err(self.pipeline.abort(&request, err));
            }
        };
        self.pipeline
            .tracker()
            .attach_ledger_tx(&request, MutationKind::DeleteDocument, &tx_hash)?;

        let next_version = current.increase_version()?;
        info!(
            ehr_id,
            version_id = %current,
            tx_hash = %hex::encode(tx_hash),
            "[gw-04] composition deleted"
        );
        Ok(DeleteOutcome {
            next_version,
            request_id: request,
        })
    }

    /// Last live version of every composition in `ehr_id`.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        ehr_id: &str,
    ) -> Result<Vec<DocumentItem>, GatewayError> {
        let records = self
            .pipeline
            .index()
            .list_by_scope(&ehr_scope(ehr_id), DocumentKind::Composition)
            .await
            .map_err(|e| GatewayError::from(e).context(format!("compositions of EHR {ehr_id}")))?;
        let keys = self.pipeline.keys(ctx).await?;
        let authority = self.pipeline.authority(ctx);

        let mut items = Vec::new();
        for record in records {
            if !record.is_last || record.is_deleted() {
                continue;
            }
            let timestamp = record.timestamp;
            let opened = self.pipeline.open(record, &keys, authority)?;
            let name = match opened.record.attributes.get(AttributeCode::NameEncrypted) {
                Some(encrypted) => String::from_utf8(opened.key.decrypt(encrypted)?)
                    .map_err(|_| GatewayError::Encryption("name is not utf-8".into()))?,
                None => String::new(),
            };
            items.push(DocumentItem {
                name,
                uid: opened.id.to_string(),
                time_created: rfc3339(u64::from(timestamp)),
            });
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::*;
    use crate::service::EhrService;
    use serde_json::json;
    use shared_types::ErrorKind;

    async fn with_ehr(f: &Fixture) -> String {
        let created = EhrService::new(f.pipeline.clone())
            .create_ehr(&f.ctx("u1"), "S1", "ns")
            .await
            .unwrap();
        f.settle().await;
        created.ehr_id
    }

    #[tokio::test]
    async fn test_create_update_and_read_versions() {
        let f = Fixture::new();
        let ehr_id = with_ehr(&f).await;
        let svc = CompositionService::new(f.pipeline.clone());
        let ctx = f.ctx("u1");

        let v1 = svc
            .create(&ctx, &ehr_id, Composition::new("Vitals", json!({"pulse": 70})))
            .await
            .unwrap();
        f.settle().await;
        let v2 = svc
            .update(
                &ctx,
                &ehr_id,
                &v1.id.to_string(),
                Composition::new("Vitals", json!({"pulse": 75})),
            )
            .await
            .unwrap();
        assert_eq!(v2.id.version(), 2);
        f.settle().await;

        let first = svc.get_by_version(&ctx, &v1.id.to_string()).await.unwrap();
        assert_eq!(first.content, json!({"pulse": 70}));
        assert_eq!(first.uid, v1.id.to_string());

        let (latest, latest_id) = svc.get_latest(&ctx, v1.id.uid()).await.unwrap();
        assert_eq!(latest.content, json!({"pulse": 75}));
        assert_eq!(latest_id, v2.id);
    }

    #[tokio::test]
    async fn test_create_requires_existing_ehr() {
        let f = Fixture::new();
        let svc = CompositionService::new(f.pipeline.clone());
        let err = svc
            .create(&f.ctx("u1"), "missing", Composition::new("A", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(f.content.len(), 0);
    }

    #[tokio::test]
    async fn test_delete_leaves_tombstone() {
        let f = Fixture::new();
        let ehr_id = with_ehr(&f).await;
        let svc = CompositionService::new(f.pipeline.clone());
        let ctx = f.ctx("u1");
        let v1 = svc
            .create(&ctx, &ehr_id, Composition::new("A", json!({})))
            .await
            .unwrap();
        f.settle().await;

        let deleted = svc.delete(&ctx, &ehr_id, &v1.id.to_string()).await.unwrap();
        assert_eq!(deleted.next_version.version(), 2);

        let err = svc.get_by_version(&ctx, &v1.id.to_string()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyDeleted);

        let again = svc.delete(&ctx, &ehr_id, &v1.id.to_string()).await.unwrap_err();
        assert_eq!(again.kind(), ErrorKind::AlreadyDeleted);

        let update = svc
            .update(&ctx, &ehr_id, &v1.id.to_string(), Composition::new("A", json!({})))
            .await
            .unwrap_err();
        assert_eq!(update.kind(), ErrorKind::AlreadyDeleted);
    }

    #[tokio::test]
    async fn test_only_owner_can_delete() {
        let f = Fixture::new();
        let ehr_id = with_ehr(&f).await;
        let svc = CompositionService::new(f.pipeline.clone());
        let v1 = svc
            .create(&f.ctx("u1"), &ehr_id, Composition::new("A", json!({})))
            .await
            .unwrap();
        f.settle().await;

        // Another user cannot even open the sealed key to check the precondition.
        let err = svc
            .delete(&f.ctx("u2"), &ehr_id, &v1.id.to_string())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encryption);
    }

    #[tokio::test]
    async fn test_list_shows_last_live_versions() {
        let f = Fixture::new();
        let ehr_id = with_ehr(&f).await;
        let svc = CompositionService::new(f.pipeline.clone());
        let ctx = f.ctx("u1");

        let a = svc
            .create(&ctx, &ehr_id, Composition::new("Vitals", json!({})))
            .await
            .unwrap();
        let b = svc
            .create(&ctx, &ehr_id, Composition::new("Labs", json!({})))
            .await
            .unwrap();
        f.settle().await;
        let a2 = svc
            .update(&ctx, &ehr_id, &a.id.to_string(), Composition::new("Vitals v2", json!({})))
            .await
            .unwrap();
        svc.delete(&ctx, &ehr_id, &b.id.to_string()).await.unwrap();

        let items = svc.list(&ctx, &ehr_id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Vitals v2");
        assert_eq!(items[0].uid, a2.id.to_string());
        assert_eq!(items[0].time_created, "2023-11-14T22:13:20Z");
    }
}
