//! # Nonce Sequencing
//!
//! A ledger account accepts exactly one transaction per nonce. Concurrent
//! batches for the same signer would otherwise read the same pending nonce
//! and one of them would revert with `NNC`.
//!
//! The sequencer keeps one async slot per signer address. A batch holds the
//! slot's lease from `new_batch` until `commit`, so batches of one signer
//! are serialized while batches of different signers proceed in parallel.
//!
//! | Outcome | Cached nonce |
//! |---------|--------------|
//! | commit succeeded | `n + 1` |
//! | commit failed | cleared, re-read from the ledger next time |
//! | batch dropped uncommitted | unchanged |

use crate::domain::LedgerError;
use crate::ports::LedgerTransport;
use parking_lot::Mutex;
use shared_types::Address;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Hands out one nonce lease per signer at a time.
#[derive(Debug, Default)]
pub struct NonceSequencer {
    slots: Mutex<HashMap<Address, Arc<AsyncMutex<Option<u64>>>>>,
}

impl NonceSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the signer's slot and take it.
    pub async fn lease(&self, address: Address) -> NonceLease {
        let slot = {
            let mut slots = self.slots.lock();
            slots.entry(address).or_default().clone()
        };
        NonceLease {
            address,
            guard: slot.lock_owned().await,
        }
    }
}

/// Exclusive right to use the next nonce of one signer.
#[derive(Debug)]
pub struct NonceLease {
    address: Address,
    guard: OwnedMutexGuard<Option<u64>>,
}

impl NonceLease {
    pub fn address(&self) -> Address {
        self.address
    }

    /// The nonce this lease grants, fetched from the ledger if not cached.
    pub async fn current(&mut self, transport: &dyn LedgerTransport) -> Result<u64, LedgerError> {
        if let Some(nonce) = *self.guard {
            return Ok(nonce);
        }
        let nonce = transport.pending_nonce(&self.address).await?;
        *self.guard = Some(nonce);
        Ok(nonce)
    }

    /// The leased nonce was consumed by an accepted transaction.
    pub fn advance(mut self) {
        if let Some(nonce) = self.guard.as_mut() {
            *nonce += 1;
        }
    }

    /// The ledger state is unknown; re-read it on the next lease.
    pub fn invalidate(mut self) {
        *self.guard = None;
    }
}
