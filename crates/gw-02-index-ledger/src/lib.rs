//! # Index Ledger Subsystem (gw-02)
//!
//! Translates document-index intents into signed, nonce-sequenced ledger
//! calls and serves read queries against the on-chain index.
//!
//! ## Write Path
//!
//! ```text
//! IndexClient::new_batch(key) ──lease nonce──→ MultiCallTx { nonce }
//!        │
//!        ├── encode_add_document(.., Some(nonce)) ──→ batch.add(AddDocument, payload)
//!        ├── encode_set_user_mapping(.., Some(nonce)) ──→ batch.add(SetUser, payload)
//!        ↓
//! batch.commit() ──→ LedgerTransport::submit ──→ CommitReceipt { tx_hash, kinds }
//! ```
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | One nonce per batch | Fixed at `new_batch`, every payload signed with it |
//! | Single-use batch | `commit(self)` consumes the batch; no add after commit |
//! | Nonce advances only on success | `NonceLease::advance` called only after `submit` returns Ok |
//! | One writer per signer | The sequencer hands out one lease per address at a time |
//! | Ledger failures are typed | Revert reasons are classified once, in `RevertCode::from_reason` |
//!
//! ## Hexagonal Architecture
//!
//! - **Domain Layer** (`domain/`): calls, signing, batch, nonce sequencing, errors
//! - **Ports Layer** (`ports/`): `LedgerTransport`
//! - **Adapters Layer** (`adapters/`): `InMemoryLedger` emulating the index contract

pub mod adapters;
pub mod client;
pub mod domain;
pub mod ports;

pub use adapters::InMemoryLedger;
pub use client::IndexClient;
pub use domain::{
    subject_key, user_key, CommitReceipt, IndexCall, LedgerError, MultiCallTx, NonceLease,
    NonceSequencer, RevertCode, SignedCall,
};
pub use ports::{LedgerTransaction, LedgerTransport, RecordQuery, TxStatus};
