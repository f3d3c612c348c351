//! # EHR_STATUS Service
//!
//! Status versions are resolved through the EHR document, which references
//! the status by its base uid. Updating a status therefore writes only the
//! new status version and re-points the subject mapping.

use super::ehr_scope;
use crate::domain::{Ehr, EhrStatus, RequestContext, SavedDocument};
use crate::pipeline::{DocumentPipeline, ReadTarget, SaveTarget};
use gw_02_index_ledger::subject_key;
use shared_types::{base_identity_of, DocumentKind, GatewayError, MutationKind, VersionedId};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct StatusService {
    pipeline: Arc<DocumentPipeline>,
}

impl StatusService {
    pub fn new(pipeline: Arc<DocumentPipeline>) -> Self {
        Self { pipeline }
    }

    async fn ehr(&self, ctx: &RequestContext, ehr_id: &str) -> Result<Ehr, GatewayError> {
        let (ehr, _) = self
            .pipeline
            .read::<Ehr>(ctx, ReadTarget::Latest(base_identity_of(ehr_id)))
            .await
            .map_err(|e| e.context(format!("EHR {ehr_id}")))?;
        Ok(ehr)
    }

    /// Current status of an EHR.
    pub async fn get_status(
        &self,
        ctx: &RequestContext,
        ehr_id: &str,
    ) -> Result<(EhrStatus, VersionedId), GatewayError> {
        let ehr = self.ehr(ctx, ehr_id).await?;
        self.pipeline
            .read::<EhrStatus>(ctx, ReadTarget::Latest(base_identity_of(&ehr.ehr_status.id)))
            .await
    }

    pub async fn get_status_by_version(
        &self,
        ctx: &RequestContext,
        version_id: &str,
    ) -> Result<EhrStatus, GatewayError> {
        let id = VersionedId::parse(version_id, self.pipeline.authority(ctx))?;
        let (status, _) = self
            .pipeline
            .read::<EhrStatus>(ctx, ReadTarget::Version(id))
            .await?;
        Ok(status)
    }

    /// Status version in effect at Unix time `at`.
    pub async fn get_status_at_time(
        &self,
        ctx: &RequestContext,
        ehr_id: &str,
        at: u32,
    ) -> Result<(EhrStatus, VersionedId), GatewayError> {
        let ehr = self.ehr(ctx, ehr_id).await?;
        self.pipeline
            .read::<EhrStatus>(
                ctx,
                ReadTarget::AtTime(base_identity_of(&ehr.ehr_status.id), at),
            )
            .await
    }

    /// Save a new status version if `preceding_version_id` is the current one.
    #[instrument(skip(self, ctx, status), fields(user_id = %ctx.user_id))]
    pub async fn update_status(
        &self,
        ctx: &RequestContext,
        ehr_id: &str,
        preceding_version_id: &str,
        mut status: EhrStatus,
    ) -> Result<SavedDocument, GatewayError> {
        let authority = self.pipeline.authority(ctx).to_string();
        let preceding = VersionedId::parse(preceding_version_id, &authority)?;

        let ehr = self.ehr(ctx, ehr_id).await?;
        let keys = self.pipeline.keys(ctx).await?;
        let status_ref = VersionedId::new(
            ehr.ehr_status.id.as_str(),
            authority.as_str(),
            preceding.version(),
        )?;
        let current = self
            .pipeline
            .check_precondition(ctx, &keys, DocumentKind::EhrStatus, &status_ref)
            .await?;
        // The precondition must name this EHR's status, not just a matching version.
        if current.uid() != preceding.uid() {
            return Err(GatewayError::PreconditionFailed {
                current: current.to_string(),
            });
        }

        let next = current.increase_version()?;
        status.uid = next.to_string();

        let request = self.pipeline.tracker().start(&ctx.user_id, Some(ehr_id));
        let index = self.pipeline.index();
        async {
            let mut batch = index.new_batch(&keys.private_key).await?;
            let target = SaveTarget {
                scope: ehr_scope(ehr_id),
                id: &next,
                request: &request,
            };
            self.pipeline
                .save(ctx, &keys, &mut batch, target, &status)
                .await
                .map_err(|e| e.context(format!("EHR_STATUS {next}")))?;

            if let Some(subject) = status.subject_ref() {
                let payload = index
                    .encode_set_subject_mapping(
                        subject_key(&subject.id, &subject.namespace),
                        ehr_id,
                        &keys.private_key,
                        Some(batch.nonce()),
                    )
                    .await?;
                batch.add(MutationKind::SetSubject, payload);
            }

            self.pipeline.commit(batch, &request).await
        }
        .await
        .map_err(|e| self.pipeline.abort(&request, e))?;
        info!(ehr_id, version_id = %next, request_id = %request, "[gw-04] EHR_STATUS updated");
        Ok(SavedDocument {
            id: next,
            request_id: request,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::*;
    use crate::service::EhrService;
    use shared_types::TimeSource;

    async fn setup(f: &Fixture) -> (String, VersionedId) {
        let created = EhrService::new(f.pipeline.clone())
            .create_ehr(&f.ctx("u1"), "S1", "ns")
            .await
            .unwrap();
        f.settle().await;
        (created.ehr_id, created.status_id)
    }

    #[tokio::test]
    async fn test_update_with_current_version() {
        let f = Fixture::new();
        let (ehr_id, status_id) = setup(&f).await;
        let svc = StatusService::new(f.pipeline.clone());
        let ctx = f.ctx("u1");

        let mut status = svc.get_status_by_version(&ctx, &status_id.to_string()).await.unwrap();
        status.is_queryable = false;
        let saved = svc
            .update_status(&ctx, &ehr_id, &status_id.to_string(), status)
            .await
            .unwrap();
        assert_eq!(saved.id.version(), 2);
        assert_eq!(saved.id.uid(), status_id.uid());

        f.settle().await;
        let (latest, latest_id) = svc.get_status(&ctx, &ehr_id).await.unwrap();
        assert!(!latest.is_queryable);
        assert_eq!(latest_id, saved.id);
    }

    #[tokio::test]
    async fn test_stale_precondition_reports_current_version() {
        let f = Fixture::new();
        let (ehr_id, status_id) = setup(&f).await;
        let svc = StatusService::new(f.pipeline.clone());
        let ctx = f.ctx("u1");
        let status = EhrStatus::new("", "S1", "ns");

        let v2 = svc
            .update_status(&ctx, &ehr_id, &status_id.to_string(), status.clone())
            .await
            .unwrap();
        f.settle().await;

        let stale = svc
            .update_status(&ctx, &ehr_id, &status_id.to_string(), status)
            .await
            .unwrap_err();
        assert_eq!(
            stale,
            GatewayError::PreconditionFailed {
                current: v2.id.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_time_travel_read() {
        let f = Fixture::new();
        let (ehr_id, status_id) = setup(&f).await;
        let svc = StatusService::new(f.pipeline.clone());
        let ctx = f.ctx("u1");
        let created_at = f.time.now_u32();

        f.time.advance(3600);
        let mut status = EhrStatus::new("", "S1", "ns");
        status.is_modifiable = false;
        svc.update_status(&ctx, &ehr_id, &status_id.to_string(), status)
            .await
            .unwrap();
        f.settle().await;

        let (then, then_id) = svc.get_status_at_time(&ctx, &ehr_id, created_at + 60).await.unwrap();
        assert!(then.is_modifiable);
        assert_eq!(then_id.version(), 1);

        let (now, _) = svc.get_status_at_time(&ctx, &ehr_id, f.time.now_u32()).await.unwrap();
        assert!(!now.is_modifiable);
    }

    #[tokio::test]
    async fn test_malformed_precondition() {
        let f = Fixture::new();
        let svc = StatusService::new(f.pipeline.clone());
        let err = svc
            .update_status(&f.ctx("u1"), "e", "not-a-version", EhrStatus::new("", "S", "n"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), shared_types::ErrorKind::Format);
    }
}
