//! Domain layer for the index ledger.

pub mod batch;
pub mod calls;
pub mod errors;
pub mod keys;
pub mod nonce;

pub use batch::{CommitReceipt, MultiCallTx};
pub use calls::{IndexCall, SignedCall};
pub use errors::{LedgerError, RevertCode};
pub use keys::{subject_key, user_key};
pub use nonce::{NonceLease, NonceSequencer};
