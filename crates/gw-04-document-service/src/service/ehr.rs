//! # EHR Service
//!
//! Creates the EHR root document together with its first status, and
//! resolves EHRs by id, by owning user and by subject.
//!
//! A create writes one batch:
//!
//! | # | Mutation | Key |
//! |---|----------|-----|
//! | 1 | AddDocument | EHR, base = sha3(ehr_id), v1 |
//! | 2 | AddDocument | EHR_STATUS, base = sha3(status uid), v1 |
//! | 3 | SetUser | user key → ehr_id |
//! | 4 | SetSubject | subject key → ehr_id |

use super::{ehr_scope, rfc3339};
use crate::domain::{Ehr, EhrCreated, EhrStatus, ObjectRef, RequestContext};
use crate::pipeline::{DocumentPipeline, ReadTarget, SaveTarget};
use gw_02_index_ledger::{subject_key, user_key};
use shared_types::{base_identity_of, GatewayError, MutationKind, VersionedId};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct EhrService {
    pipeline: Arc<DocumentPipeline>,
}

impl EhrService {
    pub fn new(pipeline: Arc<DocumentPipeline>) -> Self {
        Self { pipeline }
    }

    /// Create an EHR with a generated id.
    pub async fn create_ehr(
        &self,
        ctx: &RequestContext,
        subject_id: &str,
        namespace: &str,
    ) -> Result<EhrCreated, GatewayError> {
        let ehr_id = uuid::Uuid::new_v4().to_string();
        self.create_ehr_with_id(ctx, &ehr_id, subject_id, namespace)
            .await
    }

    /// Create an EHR under a caller-chosen id. A user owns at most one EHR.
    #[instrument(skip(self, ctx), fields(user_id = %ctx.user_id))]
    pub async fn create_ehr_with_id(
        &self,
        ctx: &RequestContext,
        ehr_id: &str,
        subject_id: &str,
        namespace: &str,
    ) -> Result<EhrCreated, GatewayError> {
        let authority = self.pipeline.authority(ctx).to_string();
        let ehr_version = VersionedId::new(ehr_id, authority.as_str(), 1)?;
        if subject_id.is_empty() {
            return Err(GatewayError::FieldEmpty("subject id".into()));
        }

        let index = self.pipeline.index();
        let owner_key = user_key(&ctx.user_id, &authority);
        match index.ehr_by_user(&owner_key).await {
            Ok(existing) => {
                return Err(GatewayError::AlreadyExists(format!(
                    "user {} already owns EHR {existing}",
                    ctx.user_id
                )))
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(GatewayError::from(e).context("EHR ownership lookup")),
        }

        let status_id = VersionedId::generate(&authority)?;
        let status = EhrStatus::new(status_id.to_string(), subject_id, namespace);
        let ehr = Ehr {
            system_id: authority.clone(),
            ehr_id: ehr_id.to_string(),
            ehr_status: ObjectRef {
                id: status_id.uid().to_string(),
                namespace: "local".to_string(),
                kind: "EHR_STATUS".to_string(),
            },
            time_created: rfc3339(self.pipeline.time().now()),
        };

        let keys = self.pipeline.keys(ctx).await?;
        let request = self.pipeline.tracker().start(&ctx.user_id, Some(ehr_id));
        let scope = ehr_scope(ehr_id);
        let receipt = async {
            let mut batch = index.new_batch(&keys.private_key).await?;

            let ehr_target = SaveTarget {
                scope,
                id: &ehr_version,
                request: &request,
            };
            self.pipeline
                .save(ctx, &keys, &mut batch, ehr_target, &ehr)
                .await
                .map_err(|e| e.context(format!("EHR {ehr_id}")))?;

            let status_target = SaveTarget {
                scope,
                id: &status_id,
                request: &request,
            };
            self.pipeline
                .save(ctx, &keys, &mut batch, status_target, &status)
                .await
                .map_err(|e| e.context(format!("EHR_STATUS {status_id}")))?;

            let nonce = Some(batch.nonce());
            let user_payload = index
                .encode_set_user_mapping(owner_key, ehr_id, &keys.private_key, nonce)
                .await?;
            batch.add(MutationKind::SetUser, user_payload);
            let subject_payload = index
                .encode_set_subject_mapping(
                    subject_key(subject_id, namespace),
                    ehr_id,
                    &keys.private_key,
                    nonce,
                )
                .await?;
            batch.add(MutationKind::SetSubject, subject_payload);

            self.pipeline.commit(batch, &request).await
        }
        .await
        .map_err(|e| self.pipeline.abort(&request, e))?;
        info!(
            ehr_id,
            request_id = %request,
            tx_hash = %hex::encode(receipt.tx_hash),
            "[gw-04] EHR created"
        );

        Ok(EhrCreated {
            ehr_id: ehr_id.to_string(),
            ehr_version,
            status_id,
            request_id: request,
        })
    }

    /// Latest EHR document.
    pub async fn get_ehr(
        &self,
        ctx: &RequestContext,
        ehr_id: &str,
    ) -> Result<(Ehr, VersionedId), GatewayError> {
        self.pipeline
            .read::<Ehr>(ctx, ReadTarget::Latest(base_identity_of(ehr_id)))
            .await
            .map_err(|e| e.context(format!("EHR {ehr_id}")))
    }

    /// Id of the EHR owned by the calling user.
    pub async fn get_ehr_id_by_user(&self, ctx: &RequestContext) -> Result<String, GatewayError> {
        let key = user_key(&ctx.user_id, self.pipeline.authority(ctx));
        self.pipeline
            .index()
            .ehr_by_user(&key)
            .await
            .map_err(|e| GatewayError::from(e).context(format!("EHR of user {}", ctx.user_id)))
    }

    pub async fn get_ehr_by_subject(
        &self,
        ctx: &RequestContext,
        subject_id: &str,
        namespace: &str,
    ) -> Result<(Ehr, VersionedId), GatewayError> {
        let ehr_id = self
            .pipeline
            .index()
            .ehr_by_subject(&subject_key(subject_id, namespace))
            .await
            .map_err(|e| {
                GatewayError::from(e).context(format!("EHR of subject {subject_id}@{namespace}"))
            })?;
        self.get_ehr(ctx, &ehr_id).await
    }
}
