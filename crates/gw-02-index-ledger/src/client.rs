//! # Index Client
//!
//! Entry point for every index mutation and query. Encoding helpers sign one
//! call with the caller's ledger key; callers that build a batch pass the
//! batch nonce so all payloads share it.

use crate::domain::{
    CommitReceipt, IndexCall, LedgerError, MultiCallTx, NonceSequencer, SignedCall,
};
use crate::ports::{LedgerTransport, RecordQuery, TxStatus};
use shared_crypto::LedgerSigner;
use shared_types::{DocumentKind, DocumentRecord, Hash, TxHash};
use std::sync::Arc;
use tracing::debug;

/// Signs, batches and submits index calls; answers index queries.
#[derive(Clone)]
pub struct IndexClient {
    transport: Arc<dyn LedgerTransport>,
    sequencer: Arc<NonceSequencer>,
}

impl IndexClient {
    pub fn new(transport: Arc<dyn LedgerTransport>) -> Self {
        Self {
            transport,
            sequencer: Arc::new(NonceSequencer::new()),
        }
    }

    pub fn transport(&self) -> &Arc<dyn LedgerTransport> {
        &self.transport
    }

    // =========================================================================
    // Batches
    // =========================================================================

    /// Start a batch for the signer of `private_key`.
    ///
    /// Waits while another batch of the same signer is open.
    pub async fn new_batch(&self, private_key: &[u8; 32]) -> Result<MultiCallTx, LedgerError> {
        let signer = LedgerSigner::from_bytes(private_key)?;
        let mut lease = self.sequencer.lease(signer.address()).await;
        let nonce = lease.current(self.transport.as_ref()).await?;
        debug!(signer = %hex::encode(signer.address()), nonce, "[gw-02] batch opened");
        Ok(MultiCallTx::new(lease, nonce, Arc::clone(&self.transport)))
    }

    /// Sign and submit one call in its own transaction.
    pub async fn send_single(
        &self,
        private_key: &[u8; 32],
        call: IndexCall,
    ) -> Result<TxHash, LedgerError> {
        let signer = LedgerSigner::from_bytes(private_key)?;
        let kind = call.mutation_kind();
        let mut batch = self.new_batch(private_key).await?;
        let payload = SignedCall::sign(call, &signer, batch.nonce())?.encode()?;
        batch.add(kind, payload);
        let CommitReceipt { tx_hash, .. } = batch.commit().await?;
        Ok(tx_hash)
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    /// Sign `call` for `nonce`, or for the ledger's pending nonce when `None`.
    async fn encode(
        &self,
        call: IndexCall,
        private_key: &[u8; 32],
        nonce: Option<u64>,
    ) -> Result<Vec<u8>, LedgerError> {
        let signer = LedgerSigner::from_bytes(private_key)?;
        let nonce = match nonce {
            Some(n) => n,
            None => self.transport.pending_nonce(&signer.address()).await?,
        };
        SignedCall::sign(call, &signer, nonce)?.encode()
    }

    pub async fn encode_add_document(
        &self,
        scope: Hash,
        kind: DocumentKind,
        base_hash: Hash,
        record: DocumentRecord,
        private_key: &[u8; 32],
        nonce: Option<u64>,
    ) -> Result<Vec<u8>, LedgerError> {
        let call = IndexCall::AddDocument {
            scope,
            kind,
            base_hash,
            record,
        };
        self.encode(call, private_key, nonce).await
    }

    pub async fn encode_set_subject_mapping(
        &self,
        subject_key: Hash,
        ehr_id: &str,
        private_key: &[u8; 32],
        nonce: Option<u64>,
    ) -> Result<Vec<u8>, LedgerError> {
        let call = IndexCall::SetSubject {
            subject_key,
            ehr_id: ehr_id.to_string(),
        };
        self.encode(call, private_key, nonce).await
    }

    pub async fn encode_set_user_mapping(
        &self,
        user_key: Hash,
        ehr_id: &str,
        private_key: &[u8; 32],
        nonce: Option<u64>,
    ) -> Result<Vec<u8>, LedgerError> {
        let call = IndexCall::SetUser {
            user_key,
            ehr_id: ehr_id.to_string(),
        };
        self.encode(call, private_key, nonce).await
    }

    pub async fn encode_delete_document(
        &self,
        kind: DocumentKind,
        base_hash: Hash,
        version: [u8; 32],
        private_key: &[u8; 32],
        nonce: Option<u64>,
    ) -> Result<Vec<u8>, LedgerError> {
        let call = IndexCall::DeleteDocument {
            kind,
            base_hash,
            version,
        };
        self.encode(call, private_key, nonce).await
    }

    /// Tombstone one version in its own transaction.
    pub async fn delete_document(
        &self,
        kind: DocumentKind,
        base_hash: Hash,
        version: [u8; 32],
        private_key: &[u8; 32],
    ) -> Result<TxHash, LedgerError> {
        let call = IndexCall::DeleteDocument {
            kind,
            base_hash,
            version,
        };
        self.send_single(private_key, call).await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get_by_version(
        &self,
        kind: DocumentKind,
        base_hash: Hash,
        version: Option<[u8; 32]>,
    ) -> Result<DocumentRecord, LedgerError> {
        self.transport
            .get_record(RecordQuery::ByVersion {
                kind,
                base_hash,
                version,
            })
            .await
    }

    pub async fn get_last_by_base(
        &self,
        kind: DocumentKind,
        base_hash: Hash,
    ) -> Result<DocumentRecord, LedgerError> {
        self.transport
            .get_record(RecordQuery::LastByBase { kind, base_hash })
            .await
    }

    pub async fn get_by_nearest_time(
        &self,
        kind: DocumentKind,
        base_hash: Hash,
        at: u32,
    ) -> Result<DocumentRecord, LedgerError> {
        self.transport
            .get_record(RecordQuery::NearestTime {
                kind,
                base_hash,
                at,
            })
            .await
    }

    pub async fn list_by_scope(
        &self,
        scope: &Hash,
        kind: DocumentKind,
    ) -> Result<Vec<DocumentRecord>, LedgerError> {
        self.transport.list_records(scope, kind).await
    }

    pub async fn ehr_by_user(&self, user_key: &Hash) -> Result<String, LedgerError> {
        self.transport.ehr_by_user(user_key).await
    }

    pub async fn ehr_by_subject(&self, subject_key: &Hash) -> Result<String, LedgerError> {
        self.transport.ehr_by_subject(subject_key).await
    }

    pub async fn tx_status(&self, tx_hash: &TxHash) -> Result<TxStatus, LedgerError> {
        self.transport.tx_status(tx_hash).await
    }
}

impl std::fmt::Debug for IndexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexClient").finish_non_exhaustive()
    }
}
