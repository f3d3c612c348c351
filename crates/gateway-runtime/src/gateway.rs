//! # Gateway Facade
//!
//! The document API exposed to callers such as a REST layer. Every operation
//! is timed and its failures counted by error kind; successful writes and
//! reads feed the per-kind document counters.
//!
//! | Call | Maps to |
//! |------|---------|
//! | CreateDocument | `create_ehr`, `create_composition`, `store_query` |
//! | UpdateDocument | `update_status`, `update_composition` |
//! | GetDocument | `get_*` with a [`DocumentRef`] |
//! | DeleteDocument | `delete_composition` |

use std::future::Future;
use std::sync::Arc;

use gateway_telemetry::{
    encode_metrics, TelemetryError, DOCUMENTS_DELETED, DOCUMENTS_READ, DOCUMENTS_SAVED,
    OPERATION_DURATION, PIPELINE_ERRORS,
};
use gw_03_processing::{ProcessingRequest, RequestId, RequestStatus};
use gw_04_document_service::{
    Composition, DeleteOutcome, DocumentItem, Ehr, EhrCreated, EhrStatus, RequestContext,
    SavedDocument, StoredQuery, DEFAULT_QUERY_VERSION,
};
use shared_types::{DocumentKind, GatewayError, VersionedId};
use tracing::debug;

use crate::container::GatewayContainer;

/// Which version of a versioned document to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentRef {
    /// A full `uid::system::version` id.
    Version(String),
    /// Last version of a logical id (for EHR_STATUS, the EHR id).
    Latest(String),
    /// Version in effect at a Unix time.
    AtTime(String, u32),
}

#[derive(Clone)]
pub struct Gateway {
    container: Arc<GatewayContainer>,
}

impl Gateway {
    pub fn new(container: Arc<GatewayContainer>) -> Self {
        Self { container }
    }

    pub fn container(&self) -> &Arc<GatewayContainer> {
        &self.container
    }

    async fn observe<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        let _timer = OPERATION_DURATION
            .with_label_values(&[operation])
            .start_timer();
        let result = call.await;
        if let Err(e) = &result {
            PIPELINE_ERRORS.with_label_values(&[e.kind().as_str()]).inc();
            debug!(operation, kind = e.kind().as_str(), error = %e, "[gw-runtime] operation failed");
        }
        result
    }

    fn saved(kind: DocumentKind) {
        DOCUMENTS_SAVED.with_label_values(&[kind.as_str()]).inc();
    }

    fn read(kind: DocumentKind) {
        DOCUMENTS_READ.with_label_values(&[kind.as_str()]).inc();
    }

    // =========================================================================
    // EHR
    // =========================================================================

    pub async fn create_ehr(
        &self,
        ctx: &RequestContext,
        subject_id: &str,
        namespace: &str,
        ehr_id: Option<&str>,
    ) -> Result<EhrCreated, GatewayError> {
        let ehr = &self.container.ehr;
        let created = self
            .observe("create_ehr", async {
                match ehr_id {
                    Some(id) => ehr.create_ehr_with_id(ctx, id, subject_id, namespace).await,
                    None => ehr.create_ehr(ctx, subject_id, namespace).await,
                }
            })
            .await?;
        Self::saved(DocumentKind::Ehr);
        Self::saved(DocumentKind::EhrStatus);
        Ok(created)
    }

    pub async fn get_ehr(
        &self,
        ctx: &RequestContext,
        ehr_id: &str,
    ) -> Result<(Ehr, VersionedId), GatewayError> {
        let out = self
            .observe("get_ehr", self.container.ehr.get_ehr(ctx, ehr_id))
            .await?;
        Self::read(DocumentKind::Ehr);
        Ok(out)
    }

    pub async fn get_ehr_by_subject(
        &self,
        ctx: &RequestContext,
        subject_id: &str,
        namespace: &str,
    ) -> Result<(Ehr, VersionedId), GatewayError> {
        let out = self
            .observe(
                "get_ehr_by_subject",
                self.container.ehr.get_ehr_by_subject(ctx, subject_id, namespace),
            )
            .await?;
        Self::read(DocumentKind::Ehr);
        Ok(out)
    }

    pub async fn get_ehr_id_by_user(&self, ctx: &RequestContext) -> Result<String, GatewayError> {
        self.observe("get_ehr_id_by_user", self.container.ehr.get_ehr_id_by_user(ctx))
            .await
    }

    // =========================================================================
    // EHR_STATUS
    // =========================================================================

    /// Read a status. `Latest` and `AtTime` take the EHR id.
    pub async fn get_status(
        &self,
        ctx: &RequestContext,
        target: DocumentRef,
    ) -> Result<(EhrStatus, VersionedId), GatewayError> {
        let status = &self.container.status;
        let out = self
            .observe("get_status", async {
                match &target {
                    DocumentRef::Version(id) => {
                        let parsed = VersionedId::parse(id, self.container.pipeline.authority(ctx))?;
                        let doc = status.get_status_by_version(ctx, id).await?;
                        Ok((doc, parsed))
                    }
                    DocumentRef::Latest(ehr_id) => status.get_status(ctx, ehr_id).await,
                    DocumentRef::AtTime(ehr_id, at) => {
                        status.get_status_at_time(ctx, ehr_id, *at).await
                    }
                }
            })
            .await?;
        Self::read(DocumentKind::EhrStatus);
        Ok(out)
    }

    pub async fn update_status(
        &self,
        ctx: &RequestContext,
        ehr_id: &str,
        preceding_version_id: &str,
        status: EhrStatus,
    ) -> Result<SavedDocument, GatewayError> {
        let saved = self
            .observe(
                "update_status",
                self.container
                    .status
                    .update_status(ctx, ehr_id, preceding_version_id, status),
            )
            .await?;
        Self::saved(DocumentKind::EhrStatus);
        Ok(saved)
    }

    // =========================================================================
    // COMPOSITION
    // =========================================================================

    pub async fn create_composition(
        &self,
        ctx: &RequestContext,
        ehr_id: &str,
        composition: Composition,
    ) -> Result<SavedDocument, GatewayError> {
        let saved = self
            .observe(
                "create_composition",
                self.container.compositions.create(ctx, ehr_id, composition),
            )
            .await?;
        Self::saved(DocumentKind::Composition);
        Ok(saved)
    }

    pub async fn update_composition(
        &self,
        ctx: &RequestContext,
        ehr_id: &str,
        preceding_version_id: &str,
        composition: Composition,
    ) -> Result<SavedDocument, GatewayError> {
        let saved = self
            .observe(
                "update_composition",
                self.container
                    .compositions
                    .update(ctx, ehr_id, preceding_version_id, composition),
            )
            .await?;
        Self::saved(DocumentKind::Composition);
        Ok(saved)
    }

    /// Read a composition. `Latest` and `AtTime` take the composition uid.
    pub async fn get_composition(
        &self,
        ctx: &RequestContext,
        target: DocumentRef,
    ) -> Result<(Composition, VersionedId), GatewayError> {
        let compositions = &self.container.compositions;
        let out = self
            .observe("get_composition", async {
                match &target {
                    DocumentRef::Version(id) => {
                        let parsed = VersionedId::parse(id, self.container.pipeline.authority(ctx))?;
                        let doc = compositions.get_by_version(ctx, id).await?;
                        Ok((doc, parsed))
                    }
                    DocumentRef::Latest(uid) => compositions.get_latest(ctx, uid).await,
                    DocumentRef::AtTime(uid, at) => compositions.get_at_time(ctx, uid, *at).await,
                }
            })
            .await?;
        Self::read(DocumentKind::Composition);
        Ok(out)
    }

    pub async fn delete_composition(
        &self,
        ctx: &RequestContext,
        ehr_id: &str,
        preceding_version_id: &str,
    ) -> Result<DeleteOutcome, GatewayError> {
        let outcome = self
            .observe(
                "delete_composition",
                self.container
                    .compositions
                    .delete(ctx, ehr_id, preceding_version_id),
            )
            .await?;
        DOCUMENTS_DELETED.inc();
        Ok(outcome)
    }

    pub async fn list_compositions(
        &self,
        ctx: &RequestContext,
        ehr_id: &str,
    ) -> Result<Vec<DocumentItem>, GatewayError> {
        self.observe("list_compositions", self.container.compositions.list(ctx, ehr_id))
            .await
    }

    // =========================================================================
    // STORED QUERIES
    // =========================================================================

    pub async fn store_query(
        &self,
        ctx: &RequestContext,
        query_type: &str,
        name: &str,
        version: Option<&str>,
        q: &str,
    ) -> Result<(StoredQuery, RequestId), GatewayError> {
        let version = version.unwrap_or(DEFAULT_QUERY_VERSION);
        let out = self
            .observe(
                "store_query",
                self.container
                    .queries
                    .store_version(ctx, query_type, name, version, q),
            )
            .await?;
        Self::saved(DocumentKind::Query);
        Ok(out)
    }

    pub async fn get_query(
        &self,
        ctx: &RequestContext,
        name: &str,
        version: Option<&str>,
    ) -> Result<StoredQuery, GatewayError> {
        let out = self
            .observe("get_query", self.container.queries.get(ctx, name, version))
            .await?;
        Self::read(DocumentKind::Query);
        Ok(out)
    }

    pub async fn list_queries(
        &self,
        ctx: &RequestContext,
        name_filter: Option<&str>,
    ) -> Result<Vec<StoredQuery>, GatewayError> {
        self.observe("list_queries", self.container.queries.list(ctx, name_filter))
            .await
    }

    // =========================================================================
    // PROCESSING
    // =========================================================================

    pub fn request_status(&self, id: &RequestId) -> Result<RequestStatus, GatewayError> {
        Ok(self.container.tracker.status(id)?)
    }

    pub fn request(&self, id: &RequestId) -> Result<ProcessingRequest, GatewayError> {
        Ok(self.container.tracker.snapshot(id)?)
    }

    /// Prometheus text exposition of every gateway metric.
    pub fn metrics(&self) -> Result<String, TelemetryError> {
        encode_metrics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::GatewayConfig;
    use serde_json::json;
    use shared_types::{ErrorKind, ManualTimeSource};

    fn gateway() -> Gateway {
        gateway_telemetry::register_metrics().unwrap();
        let config = GatewayConfig {
            system_id: "SYS1".into(),
            ..Default::default()
        };
        let time = Arc::new(ManualTimeSource::new(1_700_000_000));
        Gateway::new(Arc::new(GatewayContainer::with_time(config, time)))
    }

    async fn settle(gw: &Gateway) {
        let c = gw.container();
        c.deals.settle_all();
        c.ledger.confirm_all();
        c.watcher.sync_once().await;
    }

    #[tokio::test]
    async fn test_ehr_and_composition_through_facade() {
        let gw = gateway();
        let ctx = RequestContext::new("u1", "SYS1");

        let created = gw.create_ehr(&ctx, "S1", "ns", None).await.unwrap();
        assert_eq!(
            gw.request_status(&created.request_id).unwrap(),
            RequestStatus::Processing
        );
        settle(&gw).await;
        assert_eq!(
            gw.request_status(&created.request_id).unwrap(),
            RequestStatus::Done
        );

        let saved = gw
            .create_composition(&ctx, &created.ehr_id, Composition::new("Vitals", json!({"t": 1})))
            .await
            .unwrap();
        settle(&gw).await;

        let (doc, id) = gw
            .get_composition(&ctx, DocumentRef::Version(saved.id.to_string()))
            .await
            .unwrap();
        assert_eq!(doc.content, json!({"t": 1}));
        assert_eq!(id, saved.id);

        let (status, _) = gw
            .get_status(&ctx, DocumentRef::Latest(created.ehr_id.clone()))
            .await
            .unwrap();
        assert_eq!(status.subject_ref().unwrap().id, "S1");
        assert!(gw.container().content.len() >= 3);
    }

    #[tokio::test]
    async fn test_failures_are_counted_by_kind() {
        let gw = gateway();
        let ctx = RequestContext::new("u1", "SYS1");
        let before = PIPELINE_ERRORS.with_label_values(&["format"]).get();

        let err = gw
            .get_composition(&ctx, DocumentRef::Version("nope".into()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(PIPELINE_ERRORS.with_label_values(&["format"]).get() >= before + 1.0);
        assert!(gw.metrics().unwrap().contains("gw_pipeline_errors_total"));
    }

    #[tokio::test]
    async fn test_queries_default_version() {
        let gw = gateway();
        let ctx = RequestContext::new("u1", "SYS1");
        let (stored, _) = gw
            .store_query(&ctx, "AQL", "vitals", None, "SELECT c")
            .await
            .unwrap();
        assert_eq!(stored.version, DEFAULT_QUERY_VERSION);
        assert_eq!(gw.get_query(&ctx, "vitals", None).await.unwrap(), stored);
        assert_eq!(gw.list_queries(&ctx, Some("vit")).await.unwrap().len(), 1);
    }
}
