//! # Stored Query Service
//!
//! Stored queries are small, so their body lives inline on the index record
//! (`ContentEncrypted`) instead of in the content store. Each (name, version)
//! is its own base identity; a second store of the same pair is rejected by
//! the index.

use super::{query_scope, rfc3339};
use crate::domain::{RequestContext, StoredQuery};
use crate::pipeline::DocumentPipeline;
use crate::ports::UserKeys;
use gw_02_index_ledger::IndexCall;
use gw_03_processing::RequestId;
use shared_crypto::{open_sealed, seal_anonymous, sha3_256_many, DocumentKey};
use shared_types::{
    AttributeCode, Attributes, DocumentKind, DocumentRecord, GatewayError, Hash, MutationKind,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Version assigned when the caller gives none.
pub const DEFAULT_QUERY_VERSION: &str = "1.0.1";

#[derive(Clone)]
pub struct QueryService {
    pipeline: Arc<DocumentPipeline>,
}

impl QueryService {
    pub fn new(pipeline: Arc<DocumentPipeline>) -> Self {
        Self { pipeline }
    }

    fn id_hash(&self, ctx: &RequestContext, name: &str, version: &str) -> Hash {
        query_id_hash(&ctx.user_id, self.pipeline.authority(ctx), name, version)
    }

    pub async fn store(
        &self,
        ctx: &RequestContext,
        query_type: &str,
        name: &str,
        q: &str,
    ) -> Result<(StoredQuery, RequestId), GatewayError> {
        self.store_version(ctx, query_type, name, DEFAULT_QUERY_VERSION, q)
            .await
    }

    /// Store `q` under `name` and `version` in one ledger transaction.
    #[instrument(skip(self, ctx, q), fields(user_id = %ctx.user_id))]
    pub async fn store_version(
        &self,
        ctx: &RequestContext,
        query_type: &str,
        name: &str,
        version: &str,
        q: &str,
    ) -> Result<(StoredQuery, RequestId), GatewayError> {
        if name.is_empty() {
            return Err(GatewayError::FieldEmpty("query name".into()));
        }
        if q.is_empty() {
            return Err(GatewayError::FieldEmpty("query text".into()));
        }
        if version.is_empty() {
            return Err(GatewayError::FieldEmpty("query version".into()));
        }

        let query = StoredQuery {
            name: name.to_string(),
            query_type: query_type.to_string(),
            version: version.to_string(),
            saved: rfc3339(self.pipeline.time().now()),
            q: q.to_string(),
        };
        let id_hash = self.id_hash(ctx, name, version);
        let keys = self.pipeline.keys(ctx).await?;

        let body = bincode::serialize(&query)
            .map_err(|e| GatewayError::Internal(format!("query encode: {e}")))?;
        let body = self.pipeline.compressor().compress(&body)?;
        let key = DocumentKey::generate();
        let attributes = Attributes::new()
            .with(
                AttributeCode::KeyEncrypted,
                seal_anonymous(key.as_bytes(), &keys.public_key)?,
            )
            .with(AttributeCode::ContentEncrypted, key.encrypt(&body)?)
            .with(AttributeCode::NameEncrypted, key.encrypt(name.as_bytes())?);
        let record = DocumentRecord::active(
            id_hash.to_vec(),
            None,
            self.pipeline.time().now_u32(),
            attributes,
        );

        let request = self.pipeline.tracker().start(&ctx.user_id, None);
        let call = IndexCall::AddDocument {
            scope: query_scope(&ctx.user_id, self.pipeline.authority(ctx)),
            kind: DocumentKind::Query,
            base_hash: id_hash,
            record,
        };
        let tx_hash = self
            .pipeline
            .index()
            .send_single(&keys.private_key, call)
            .await
            .map_err(|e| {
                let err = GatewayError::from(e).context(format!("store query {name} {version}"));
                self.pipeline.abort(&request, err)
            })?;
        self.pipeline
            .tracker()
            .attach_ledger_tx(&request, MutationKind::AddDocument, &tx_hash)?;

        info!(name, version, request_id = %request, "[gw-04] query stored");
        Ok((query, request))
    }

    /// A stored query by name. Without `version`, the highest stored version.
    pub async fn get(
        &self,
        ctx: &RequestContext,
        name: &str,
        version: Option<&str>,
    ) -> Result<StoredQuery, GatewayError> {
        let Some(version) = version else {
            return self
                .list(ctx, Some(name))
                .await?
                .into_iter()
                .filter(|query| query.name == name)
                .last()
                .ok_or_else(|| GatewayError::NotFound(format!("query {name}")));
        };

        let record = self
            .pipeline
            .index()
            .get_by_version(DocumentKind::Query, self.id_hash(ctx, name, version), None)
            .await
            .map_err(|e| GatewayError::from(e).context(format!("query {name} {version}")))?;
        if record.is_deleted() {
            return Err(GatewayError::AlreadyDeleted(format!("query {name} {version}")));
        }
        let keys = self.pipeline.keys(ctx).await?;
        self.decode(&record, &keys)
    }

    /// Stored queries of the caller whose name starts with `name_filter`,
    /// ordered by name, then version.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        name_filter: Option<&str>,
    ) -> Result<Vec<StoredQuery>, GatewayError> {
        let scope = query_scope(&ctx.user_id, self.pipeline.authority(ctx));
        let records = self
            .pipeline
            .index()
            .list_by_scope(&scope, DocumentKind::Query)
            .await
            .map_err(|e| GatewayError::from(e).context("stored queries"))?;
        let keys = self.pipeline.keys(ctx).await?;

        let mut queries = Vec::new();
        for record in records.iter().filter(|r| !r.is_deleted()) {
            let query = self.decode(record, &keys)?;
            if name_filter.map_or(true, |prefix| query.name.starts_with(prefix)) {
                queries.push(query);
            }
        }
        queries.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| version_order(&a.version).cmp(&version_order(&b.version)))
        });
        Ok(queries)
    }

    fn decode(&self, record: &DocumentRecord, keys: &UserKeys) -> Result<StoredQuery, GatewayError> {
        let sealed = record.attributes.require(AttributeCode::KeyEncrypted)?;
        let content = record.attributes.require(AttributeCode::ContentEncrypted)?;
        let key = DocumentKey::from_slice(&open_sealed(sealed, &keys.private_key)?)?;
        let body = self.pipeline.compressor().decompress(&key.decrypt(content)?)?;
        bincode::deserialize(&body).map_err(|e| GatewayError::Internal(format!("query decode: {e}")))
    }
}

/// Numeric ordering of dotted versions; non-numeric parts sort first.
fn version_order(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}

/// Lookup key of one stored query version.
fn query_id_hash(user_id: &str, system_id: &str, name: &str, version: &str) -> Hash {
    sha3_256_many(&[
        user_id.as_bytes(),
        b"\0",
        system_id.as_bytes(),
        b"\0",
        name.as_bytes(),
        b"\0",
        version.as_bytes(),
    ])
}
