//! # Metered Adapters
//!
//! Decorators over the outbound ports that feed the Prometheus counters for
//! external legs. They forward every call unchanged.

use async_trait::async_trait;
use gateway_telemetry::{BATCHES_COMMITTED, COMMIT_FAILURES, CONTENT_BYTES_STORED};
use gw_01_content_storage::{ContentError, ContentId, ContentStore};
use gw_02_index_ledger::{LedgerError, LedgerTransaction, LedgerTransport, RecordQuery, TxStatus};
use shared_types::{Address, DocumentKind, DocumentRecord, Hash, TxHash};
use std::sync::Arc;
use tracing::warn;

/// Counts ciphertext bytes added to the content store.
pub struct MeteredContentStore {
    inner: Arc<dyn ContentStore>,
}

impl MeteredContentStore {
    pub fn new(inner: Arc<dyn ContentStore>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ContentStore for MeteredContentStore {
    async fn add(&self, bytes: Vec<u8>) -> Result<ContentId, ContentError> {
        let size = bytes.len();
        let cid = self.inner.add(bytes).await?;
        CONTENT_BYTES_STORED.inc_by(size as f64);
        Ok(cid)
    }

    async fn fetch(&self, cid: &ContentId) -> Result<Vec<u8>, ContentError> {
        self.inner.fetch(cid).await
    }
}

/// Counts accepted and failed ledger submissions.
pub struct MeteredLedger {
    inner: Arc<dyn LedgerTransport>,
}

impl MeteredLedger {
    pub fn new(inner: Arc<dyn LedgerTransport>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl LedgerTransport for MeteredLedger {
    async fn pending_nonce(&self, address: &Address) -> Result<u64, LedgerError> {
        self.inner.pending_nonce(address).await
    }

    async fn submit(&self, tx: LedgerTransaction) -> Result<TxHash, LedgerError> {
        let calls = tx.calls.len();
        match self.inner.submit(tx).await {
            Ok(hash) => {
                BATCHES_COMMITTED.inc();
                Ok(hash)
            }
            Err(e) => {
                COMMIT_FAILURES.inc();
                warn!(calls, error = %e, "[gw-runtime] ledger submission failed");
                Err(e)
            }
        }
    }

    async fn tx_status(&self, tx_hash: &TxHash) -> Result<TxStatus, LedgerError> {
        self.inner.tx_status(tx_hash).await
    }

    async fn get_record(&self, query: RecordQuery) -> Result<DocumentRecord, LedgerError> {
        self.inner.get_record(query).await
    }

    async fn list_records(
        &self,
        scope: &Hash,
        kind: DocumentKind,
    ) -> Result<Vec<DocumentRecord>, LedgerError> {
        self.inner.list_records(scope, kind).await
    }

    async fn ehr_by_user(&self, user_key: &Hash) -> Result<String, LedgerError> {
        self.inner.ehr_by_user(user_key).await
    }

    async fn ehr_by_subject(&self, subject_key: &Hash) -> Result<String, LedgerError> {
        self.inner.ehr_by_subject(subject_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_01_content_storage::InMemoryContentStore;

    #[tokio::test]
    async fn test_content_bytes_are_counted() {
        let store = MeteredContentStore::new(Arc::new(InMemoryContentStore::new()));
        let before = CONTENT_BYTES_STORED.get();
        let cid = store.add(vec![7u8; 64]).await.unwrap();
        assert!(CONTENT_BYTES_STORED.get() >= before + 64.0);
        assert_eq!(store.fetch(&cid).await.unwrap(), vec![7u8; 64]);
    }
}
