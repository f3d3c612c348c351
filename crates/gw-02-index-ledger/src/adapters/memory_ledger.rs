//! # In-Memory Ledger
//!
//! Emulates the index contract and its ledger node for tests and local runs.
//!
//! A transaction is applied to a staging copy of the state and swapped in
//! only if every call succeeds, which gives multi-call batches all-or-nothing
//! semantics. Contract failures are raised as reason strings and classified
//! through `RevertCode::from_reason`, the same path a remote node takes.

use crate::domain::{IndexCall, LedgerError, RevertCode, SignedCall};
use crate::ports::{LedgerTransaction, LedgerTransport, RecordQuery, TxStatus};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_crypto::keccak256;
use shared_types::{Address, DocumentKind, DocumentRecord, DocumentStatus, Hash, TxHash};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;

#[derive(Debug, Clone)]
struct StoredRecord {
    kind: DocumentKind,
    base_hash: Hash,
    scope: Hash,
    owner: Address,
    record: DocumentRecord,
}

impl StoredRecord {
    fn matches(&self, kind: DocumentKind, base_hash: &Hash) -> bool {
        self.kind == kind && &self.base_hash == base_hash
    }
}

#[derive(Debug, Clone, Default)]
struct LedgerState {
    nonces: HashMap<Address, u64>,
    records: Vec<StoredRecord>,
    users: HashMap<Hash, String>,
    subjects: HashMap<Hash, String>,
}

impl LedgerState {
    fn apply(&mut self, from: Address, call: IndexCall) -> Result<(), &'static str> {
        match call {
            IndexCall::AddDocument {
                scope,
                kind,
                base_hash,
                mut record,
            } => {
                if self
                    .records
                    .iter()
                    .any(|r| r.matches(kind, &base_hash) && r.record.version == record.version)
                {
                    return Err("AEX");
                }
                for prior in self.records.iter_mut().filter(|r| r.matches(kind, &base_hash)) {
                    prior.record.is_last = false;
                }
                record.is_last = true;
                self.records.push(StoredRecord {
                    kind,
                    base_hash,
                    scope,
                    owner: from,
                    record,
                });
            }
            IndexCall::SetUser { user_key, ehr_id } => {
                if self.users.contains_key(&user_key) {
                    return Err("AEX");
                }
                self.users.insert(user_key, ehr_id);
            }
            IndexCall::SetSubject {
                subject_key,
                ehr_id,
            } => {
                self.subjects.insert(subject_key, ehr_id);
            }
            IndexCall::DeleteDocument {
                kind,
                base_hash,
                version,
            } => {
                let stored = self
                    .records
                    .iter_mut()
                    .find(|r| r.matches(kind, &base_hash) && r.record.version == Some(version))
                    .ok_or("NFD")?;
                if stored.owner != from {
                    return Err("DND");
                }
                if stored.record.is_deleted() {
                    return Err("ADL");
                }
                stored.record.status = DocumentStatus::Deleted;
            }
        }
        Ok(())
    }

    fn find(&self, query: &RecordQuery) -> Option<&StoredRecord> {
        match query {
            RecordQuery::ByVersion {
                kind,
                base_hash,
                version: Some(version),
            } => self
                .records
                .iter()
                .find(|r| r.matches(*kind, base_hash) && r.record.version == Some(*version)),
            RecordQuery::ByVersion {
                kind,
                base_hash,
                version: None,
            }
            | RecordQuery::LastByBase { kind, base_hash } => self
                .records
                .iter()
                .find(|r| r.matches(*kind, base_hash) && r.record.is_last),
            RecordQuery::NearestTime {
                kind,
                base_hash,
                at,
            } => self
                .records
                .iter()
                .filter(|r| r.matches(*kind, base_hash) && r.record.timestamp <= *at)
                // Ties go to the later insertion.
                .max_by_key(|r| r.record.timestamp),
        }
    }
}

/// Index contract plus ledger node, held in memory.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
    txs: RwLock<HashMap<TxHash, TxStatus>>,
    submissions: AtomicU64,
    offline: AtomicBool,
    fail_next: Mutex<Option<String>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject all calls with a transport error while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make the next `submit` fail with a transport error, without applying it.
    pub fn fail_next_submit(&self, reason: &str) {
        *self.fail_next.lock() = Some(reason.to_string());
    }

    /// Number of transactions the ledger accepted.
    pub fn submission_count(&self) -> u64 {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Mark every pending transaction as confirmed. Returns how many changed.
    pub fn confirm_all(&self) -> usize {
        let mut txs = self.txs.write();
        let mut confirmed = 0;
        for status in txs.values_mut().filter(|s| **s == TxStatus::Pending) {
            *status = TxStatus::Confirmed;
            confirmed += 1;
        }
        confirmed
    }

    /// Mark one transaction as failed after inclusion.
    pub fn fail_tx(&self, tx_hash: &TxHash, reason: &str) -> bool {
        match self.txs.write().get_mut(tx_hash) {
            Some(status) => {
                *status = TxStatus::Failed(reason.to_string());
                true
            }
            None => false,
        }
    }

    fn check_online(&self) -> Result<(), LedgerError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(LedgerError::Transport("ledger node unreachable".into()));
        }
        Ok(())
    }

    fn tx_hash(tx: &LedgerTransaction) -> TxHash {
        let mut bytes = Vec::with_capacity(28 + tx.calls.iter().map(Vec::len).sum::<usize>());
        bytes.extend_from_slice(&tx.from);
        bytes.extend_from_slice(&tx.nonce.to_be_bytes());
        for call in &tx.calls {
            bytes.extend_from_slice(call);
        }
        keccak256(&bytes)
    }
}

fn revert(reason: &str) -> LedgerError {
    LedgerError::Revert(RevertCode::from_reason(reason))
}

#[async_trait]
impl LedgerTransport for InMemoryLedger {
    async fn pending_nonce(&self, address: &Address) -> Result<u64, LedgerError> {
        self.check_online()?;
        Ok(self.state.read().nonces.get(address).copied().unwrap_or(0))
    }

    async fn submit(&self, tx: LedgerTransaction) -> Result<TxHash, LedgerError> {
        self.check_online()?;
        if let Some(reason) = self.fail_next.lock().take() {
            return Err(LedgerError::Transport(reason));
        }

        let mut state = self.state.write();
        let expected = state.nonces.get(&tx.from).copied().unwrap_or(0);
        if tx.nonce != expected {
            return Err(revert("execution reverted: NNC"));
        }

        let mut staging = state.clone();
        for payload in &tx.calls {
            let signed = SignedCall::decode(payload)?;
            if signed.signer != tx.from || signed.nonce != tx.nonce || signed.verify().is_err() {
                return Err(revert("execution reverted: SIG"));
            }
            staging
                .apply(tx.from, signed.call)
                .map_err(|reason| revert(&format!("execution reverted: {reason}")))?;
        }
        staging.nonces.insert(tx.from, expected + 1);
        *state = staging;
        drop(state);

        let tx_hash = Self::tx_hash(&tx);
        self.txs.write().insert(tx_hash, TxStatus::Pending);
        self.submissions.fetch_add(1, Ordering::SeqCst);
        debug!(
            tx = %hex::encode(tx_hash),
            nonce = tx.nonce,
            calls = tx.calls.len(),
            "[gw-02] ledger accepted transaction"
        );
        Ok(tx_hash)
    }

    async fn tx_status(&self, tx_hash: &TxHash) -> Result<TxStatus, LedgerError> {
        self.check_online()?;
        self.txs
            .read()
            .get(tx_hash)
            .cloned()
            .ok_or_else(|| revert("NFD"))
    }

    async fn get_record(&self, query: RecordQuery) -> Result<DocumentRecord, LedgerError> {
        self.check_online()?;
        self.state
            .read()
            .find(&query)
            .map(|stored| stored.record.clone())
            .ok_or_else(|| revert("NFD"))
    }

    async fn list_records(
        &self,
        scope: &Hash,
        kind: DocumentKind,
    ) -> Result<Vec<DocumentRecord>, LedgerError> {
        self.check_online()?;
        Ok(self
            .state
            .read()
            .records
            .iter()
            .filter(|r| r.kind == kind && &r.scope == scope)
            .map(|r| r.record.clone())
            .collect())
    }

    async fn ehr_by_user(&self, user_key: &Hash) -> Result<String, LedgerError> {
        self.check_online()?;
        self.state
            .read()
            .users
            .get(user_key)
            .cloned()
            .ok_or_else(|| revert("NFD"))
    }

    async fn ehr_by_subject(&self, subject_key: &Hash) -> Result<String, LedgerError> {
        self.check_online()?;
        self.state
            .read()
            .subjects
            .get(subject_key)
            .cloned()
            .ok_or_else(|| revert("NFD"))
    }
}
