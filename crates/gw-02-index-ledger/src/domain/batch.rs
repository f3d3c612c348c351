//! # MultiCall Batch
//!
//! Accumulates signed call payloads for one signer and one nonce, then
//! submits them as a single ledger transaction.
//!
//! The batch owns the signer's [`NonceLease`] for its whole lifetime, so no
//! other batch of the same signer can be built or committed in between.

use crate::domain::{LedgerError, NonceLease};
use crate::ports::{LedgerTransaction, LedgerTransport};
use shared_types::{Address, MutationKind, TxHash};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub tx_hash: TxHash,
    /// Mutation kinds in submission order.
    pub kinds: Vec<MutationKind>,
}

/// A pending group of index mutations.
pub struct MultiCallTx {
    lease: NonceLease,
    nonce: u64,
    kinds: Vec<MutationKind>,
    payloads: Vec<Vec<u8>>,
    transport: Arc<dyn LedgerTransport>,
}

impl MultiCallTx {
    pub(crate) fn new(lease: NonceLease, nonce: u64, transport: Arc<dyn LedgerTransport>) -> Self {
        Self {
            lease,
            nonce,
            kinds: Vec::new(),
            payloads: Vec::new(),
            transport,
        }
    }

    pub fn signer(&self) -> Address {
        self.lease.address()
    }

    /// The nonce every payload in this batch must be signed with.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn add(&mut self, kind: MutationKind, payload: Vec<u8>) {
        self.kinds.push(kind);
        self.payloads.push(payload);
    }

    pub fn kinds(&self) -> &[MutationKind] {
        &self.kinds
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Submit all payloads atomically.
    ///
    /// An empty batch fails with `EmptyBatch` and leaves the nonce untouched.
    /// Any submission failure clears the cached nonce of the signer.
    pub async fn commit(self) -> Result<CommitReceipt, LedgerError> {
        let MultiCallTx {
            lease,
            nonce,
            kinds,
            payloads,
            transport,
        } = self;

        if payloads.is_empty() {
            return Err(LedgerError::EmptyBatch);
        }

        let tx = LedgerTransaction {
            from: lease.address(),
            nonce,
            calls: payloads,
        };
        match transport.submit(tx).await {
            Ok(tx_hash) => {
                lease.advance();
                debug!(
                    tx = %hex::encode(tx_hash),
                    nonce,
                    calls = kinds.len(),
                    "[gw-02] batch committed"
                );
                Ok(CommitReceipt { tx_hash, kinds })
            }
            Err(e) => {
                lease.invalidate();
                warn!(nonce, error = %e, "[gw-02] batch rejected");
                Err(e)
            }
        }
    }
}

impl fmt::Debug for MultiCallTx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiCallTx")
            .field("signer", &hex::encode(self.signer()))
            .field("nonce", &self.nonce)
            .field("kinds", &self.kinds)
            .finish()
    }
}
