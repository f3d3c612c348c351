//! # Shared Crypto - Document Envelope Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `symmetric` | XChaCha20-Poly1305 | Per-document key, body + index field encryption |
//! | `sealing` | X25519 + BLAKE3 KDF + XChaCha20-Poly1305 | Anonymous sealing of document keys |
//! | `ecdsa` | secp256k1 (recoverable) | Signing ledger calls |
//! | `hashing` | SHA3-256, Keccak-256, BLAKE3 | Identity hashes, call digests, KDF |
//!
//! ## Security Properties
//!
//! - **XChaCha20**: 192-bit random nonce per message, stored as a prefix
//! - **Auth data**: ciphertexts are bound to the identifier they were written for
//! - **Sealing**: fresh ephemeral key per seal, sender stays anonymous
//! - **secp256k1**: RFC 6979 deterministic, low-S normalized
//!
//! Every decryption failure collapses into one [`CryptoError::Decryption`]
//! with no detail about which check failed.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ecdsa;
pub mod errors;
pub mod hashing;
pub mod sealing;
pub mod symmetric;

// Re-exports
pub use ecdsa::{recover_signer, LedgerSigner, RecoverableSignature};
pub use errors::CryptoError;
pub use hashing::{blake3_derive_key, keccak256, sha3_256, sha3_256_many};
pub use sealing::{open_sealed, seal_anonymous, sealing_public_key};
pub use symmetric::{DocumentKey, KEY_LEN, NONCE_LEN};
