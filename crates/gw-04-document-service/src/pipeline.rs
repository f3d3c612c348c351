//! # Document Pipeline
//!
//! The save and read state machines shared by every document service.
//!
//! ## Save
//!
//! ```text
//! duplicate check → serialize → compress → encrypt(aad = versioned id)
//!     → content store add → start deal → seal key, encrypt uid/name/cid
//!     → AddDocument into the caller's batch → register legs
//! ```
//!
//! Nothing reaches the ledger before the caller commits the batch. Content
//! already stored and deals already started when a later step fails are left
//! in place; the processing request records them.
//!
//! ## Read
//!
//! ```text
//! index lookup → tombstone check → open sealed key → decrypt logical id
//!     → in-flight check → content fetch → decrypt → decompress → decode
//! ```

use crate::config::DocumentServiceConfig;
use crate::domain::{Document, RequestContext};
use crate::ports::{Keystore, UserKeys};
use gw_01_content_storage::{
    Compressor, ContentId, ContentStore, DealSettlement, NoopCompressor, ZstdCompressor,
};
use gw_02_index_ledger::{CommitReceipt, IndexClient, LedgerError, MultiCallTx};
use gw_03_processing::{ProcessingTracker, RequestId};
use shared_crypto::{open_sealed, seal_anonymous, DocumentKey};
use shared_types::{
    AttributeCode, Attributes, DocumentKind, DocumentRecord, GatewayError, Hash, MutationKind,
    TimeSource, VersionedId,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Which version of a document to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadTarget {
    Version(VersionedId),
    /// The version flagged as last for a base identity.
    Latest(Hash),
    /// The latest version saved at or before a Unix time.
    AtTime(Hash, u32),
}

/// Where a document version is saved.
#[derive(Debug)]
pub struct SaveTarget<'a> {
    /// Listing scope on the index.
    pub scope: Hash,
    pub id: &'a VersionedId,
    pub request: &'a RequestId,
}

/// A record whose document key has been recovered.
pub struct OpenedRecord {
    pub record: DocumentRecord,
    pub key: DocumentKey,
    pub id: VersionedId,
}

pub struct DocumentPipeline {
    index: IndexClient,
    content: Arc<dyn ContentStore>,
    deals: Arc<dyn DealSettlement>,
    tracker: Arc<ProcessingTracker>,
    keystore: Arc<dyn Keystore>,
    compressor: Arc<dyn Compressor>,
    time: Arc<dyn TimeSource>,
    config: DocumentServiceConfig,
}

impl DocumentPipeline {
    pub fn new(
        index: IndexClient,
        content: Arc<dyn ContentStore>,
        deals: Arc<dyn DealSettlement>,
        tracker: Arc<ProcessingTracker>,
        keystore: Arc<dyn Keystore>,
        time: Arc<dyn TimeSource>,
        config: DocumentServiceConfig,
    ) -> Self {
        let compressor: Arc<dyn Compressor> = if config.compression.enabled {
            Arc::new(ZstdCompressor::new(config.compression))
        } else {
            Arc::new(NoopCompressor)
        };
        Self {
            index,
            content,
            deals,
            tracker,
            keystore,
            compressor,
            time,
            config,
        }
    }

    pub fn index(&self) -> &IndexClient {
        &self.index
    }

    pub fn tracker(&self) -> &Arc<ProcessingTracker> {
        &self.tracker
    }

    pub fn compressor(&self) -> &dyn Compressor {
        self.compressor.as_ref()
    }

    pub fn time(&self) -> &dyn TimeSource {
        self.time.as_ref()
    }

    pub fn config(&self) -> &DocumentServiceConfig {
        &self.config
    }

    /// Authority for ids of this call: the caller's system, or the configured one.
    pub fn authority<'a>(&'a self, ctx: &'a RequestContext) -> &'a str {
        if ctx.system_id.is_empty() {
            &self.config.system_id
        } else {
            &ctx.system_id
        }
    }

    pub async fn keys(&self, ctx: &RequestContext) -> Result<UserKeys, GatewayError> {
        self.keystore
            .get(&ctx.user_id)
            .await
            .map_err(|e| e.context(format!("keystore user {}", ctx.user_id)))
    }

    fn timeout(&self, ctx: &RequestContext) -> Duration {
        ctx.timeout.unwrap_or(self.config.external_timeout)
    }

    /// Run an external call under the caller's deadline.
    async fn bounded<T, E>(
        &self,
        limit: Duration,
        what: &str,
        call: impl Future<Output = Result<T, E>>,
    ) -> Result<T, GatewayError>
    where
        E: Into<GatewayError>,
    {
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result.map_err(|e| Into::<GatewayError>::into(e).context(what)),
            Err(_) => Err(GatewayError::Timeout(format!(
                "{what} exceeded {}ms",
                limit.as_millis()
            ))),
        }
    }

    // =========================================================================
    // Save
    // =========================================================================

    /// Run the save pipeline for one document version and queue its index
    /// mutation into `batch`.
    #[instrument(skip_all, fields(kind = %D::KIND, version_id = %target.id, request_id = %target.request))]
    pub async fn save<D: Document>(
        &self,
        ctx: &RequestContext,
        keys: &UserKeys,
        batch: &mut MultiCallTx,
        target: SaveTarget<'_>,
        doc: &D,
    ) -> Result<(), GatewayError> {
        let id = target.id;
        let base_hash = id.base_identity();
        let version = id.version_bytes();

        match self.index.get_by_version(D::KIND, base_hash, Some(version)).await {
            Ok(existing) if existing.is_deleted() => {
                return Err(GatewayError::AlreadyDeleted(id.to_string()))
            }
            Ok(_) => return Err(GatewayError::AlreadyExists(id.to_string())),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(GatewayError::from(e).context("duplicate check")),
        }

        let body = serde_json::to_vec(doc)
            .map_err(|e| GatewayError::Internal(format!("{} encode: {e}", D::KIND)))?;
        let body = self.compressor.compress(&body)?;

        let key = DocumentKey::generate();
        let id_string = id.to_string();
        let ciphertext = key.encrypt_with_auth_data(&body, id_string.as_bytes())?;
        let size = ciphertext.len() as u64;

        let limit = self.timeout(ctx);
        let cid = self
            .bounded(limit, "content store add", self.content.add(ciphertext))
            .await?;
        let deal = self
            .bounded(limit, "start deal", self.deals.start_deal(&cid, size))
            .await?;
        debug!(cid = %cid, deal_id = %deal.deal_id, size, "[gw-04] content stored");

        let key_sealed = seal_anonymous(key.as_bytes(), &keys.public_key)?;
        let mut attributes = Attributes::new()
            .with(AttributeCode::ContentIdEncrypted, key.encrypt(&cid.to_bytes())?)
            .with(AttributeCode::KeyEncrypted, key_sealed)
            .with(AttributeCode::BaseIdHash, base_hash.to_vec())
            .with(AttributeCode::LogicalIdEncrypted, key.encrypt(id_string.as_bytes())?)
            .with(AttributeCode::DealId, deal.deal_id.0.as_bytes().to_vec())
            .with(AttributeCode::CustodianAddress, deal.custodian.0.as_bytes().to_vec());
        if let Some(name) = doc.name() {
            attributes.set(AttributeCode::NameEncrypted, key.encrypt(name.as_bytes())?);
        }

        let record = DocumentRecord::active(
            cid.to_bytes(),
            Some(version),
            self.time.now_u32(),
            attributes,
        );
        let payload = self
            .index
            .encode_add_document(
                target.scope,
                D::KIND,
                base_hash,
                record,
                &keys.private_key,
                Some(batch.nonce()),
            )
            .await?;
        batch.add(MutationKind::AddDocument, payload);

        self.tracker
            .add_record_legs(target.request, &deal.deal_id.0, cid.as_str())?;
        Ok(())
    }

    /// Mark `request` failed after `err` stopped its pipeline, and hand the
    /// error back.
    pub fn abort(&self, request: &RequestId, err: GatewayError) -> GatewayError {
        if let Err(track) = self.tracker.abort(request, &err.to_string()) {
            warn!(request_id = %request, error = %track, "[gw-04] could not record aborted request");
        }
        err
    }

    /// Commit `batch` and point the request's ledger legs at the tx.
    pub async fn commit(
        &self,
        batch: MultiCallTx,
        request: &RequestId,
    ) -> Result<CommitReceipt, GatewayError> {
        match batch.commit().await {
            Ok(receipt) => {
                for kind in &receipt.kinds {
                    self.tracker
                        .attach_ledger_tx(request, *kind, &receipt.tx_hash)?;
                }
                Ok(receipt)
            }
            Err(e) => Err(self.abort(request, GatewayError::from(e).context("batch commit"))),
        }
    }

    // =========================================================================
    // Read
    // =========================================================================

    pub async fn lookup(
        &self,
        kind: DocumentKind,
        target: &ReadTarget,
    ) -> Result<DocumentRecord, LedgerError> {
        match target {
            ReadTarget::Version(id) => {
                self.index
                    .get_by_version(kind, id.base_identity(), Some(id.version_bytes()))
                    .await
            }
            ReadTarget::Latest(base) => self.index.get_last_by_base(kind, *base).await,
            ReadTarget::AtTime(base, at) => self.index.get_by_nearest_time(kind, *base, *at).await,
        }
    }

    /// Recover the document key and logical id of `record`.
    pub fn open(
        &self,
        record: DocumentRecord,
        keys: &UserKeys,
        authority: &str,
    ) -> Result<OpenedRecord, GatewayError> {
        let key_sealed = record.attributes.require(AttributeCode::KeyEncrypted)?;
        let id_encrypted = record.attributes.require(AttributeCode::LogicalIdEncrypted)?;

        let key = DocumentKey::from_slice(&open_sealed(key_sealed, &keys.private_key)?)?;
        let id_bytes = key.decrypt(id_encrypted)?;
        let id_string = String::from_utf8(id_bytes)
            .map_err(|_| GatewayError::Encryption("logical id is not utf-8".into()))?;
        let id = VersionedId::parse(&id_string, authority)?;
        Ok(OpenedRecord { record, key, id })
    }

    /// Run the read pipeline.
    #[instrument(skip_all, fields(kind = %D::KIND, user_id = %ctx.user_id))]
    pub async fn read<D: Document>(
        &self,
        ctx: &RequestContext,
        target: ReadTarget,
    ) -> Result<(D, VersionedId), GatewayError> {
        let record = self
            .lookup(D::KIND, &target)
            .await
            .map_err(|e| GatewayError::from(e).context(format!("{} lookup", D::KIND)))?;
        if record.is_deleted() {
            let what = match &target {
                ReadTarget::Version(id) => id.to_string(),
                _ => format!("last {} record", D::KIND),
            };
            return Err(GatewayError::AlreadyDeleted(what));
        }

        let cid = ContentId::parse(&record.content_id)?;
        let keys = self.keys(ctx).await?;
        let opened = self.open(record, &keys, self.authority(ctx))?;

        if self.tracker.is_content_in_flight(cid.as_str()) {
            return Err(GatewayError::StillProcessing(opened.id.to_string()));
        }
        let ciphertext = self
            .bounded(self.timeout(ctx), "content fetch", self.content.fetch(&cid))
            .await?;

        let body = opened
            .key
            .decrypt_with_auth_data(&ciphertext, opened.id.to_string().as_bytes())?;
        let body = self.compressor.decompress(&body)?;
        let doc = serde_json::from_slice(&body)
            .map_err(|e| GatewayError::Internal(format!("{} decode: {e}", D::KIND)))?;
        Ok((doc, opened.id))
    }

    /// Check an If-Match precondition against the last version of a document.
    ///
    /// Returns the current version when it equals `preceding`.
    pub async fn check_precondition(
        &self,
        ctx: &RequestContext,
        keys: &UserKeys,
        kind: DocumentKind,
        preceding: &VersionedId,
    ) -> Result<VersionedId, GatewayError> {
        let record = self
            .index
            .get_last_by_base(kind, preceding.base_identity())
            .await
            .map_err(|e| GatewayError::from(e).context(format!("{kind} {}", preceding.uid())))?;
        let deleted = record.is_deleted();
        let current = self.open(record, keys, self.authority(ctx))?.id;
        if deleted {
            return Err(GatewayError::AlreadyDeleted(current.to_string()));
        }
        if current.version() != preceding.version() || current.uid() != preceding.uid() {
            return Err(GatewayError::PreconditionFailed {
                current: current.to_string(),
            });
        }
        Ok(current)
    }
}
