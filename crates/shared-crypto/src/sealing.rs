//! # Anonymous Sealing
//!
//! Encrypts a secret (a document key) to a recipient's X25519 public key
//! without identifying the sender.
//!
//! ## Construction
//!
//! ```text
//! eph       = random X25519 secret
//! shared    = X25519(eph, recipient_pk)
//! key       = BLAKE3-derive(SEAL_CONTEXT, shared || eph_pk || recipient_pk)
//! nonce     = BLAKE3(eph_pk || recipient_pk)[..24]
//! sealed    = eph_pk (32) || XChaCha20-Poly1305(key, nonce, secret)
//! ```
//!
//! The ephemeral key is used exactly once, so the derived nonce never repeats
//! under the same key.

use crate::hashing::blake3_derive_key;
use crate::symmetric::NONCE_LEN;
use crate::CryptoError;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

const SEAL_CONTEXT: &str = "clinical-document-gateway 2024 sealed box v1";

const PUBLIC_KEY_LEN: usize = 32;

/// X25519 public key matching a 32-byte user secret.
pub fn sealing_public_key(secret: &[u8; 32]) -> [u8; 32] {
    let secret = StaticSecret::from(*secret);
    PublicKey::from(&secret).to_bytes()
}

/// Seal `secret` so only the holder of `recipient_public`'s private key can open it.
pub fn seal_anonymous(secret: &[u8], recipient_public: &[u8; 32]) -> Result<Vec<u8>, CryptoError> {
    let mut eph_bytes = [0u8; 32];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut eph_bytes);
    let ephemeral = StaticSecret::from(eph_bytes);
    eph_bytes.zeroize();
    let ephemeral_public = PublicKey::from(&ephemeral).to_bytes();

    let (cipher, nonce) =
        box_cipher(&ephemeral, recipient_public, &ephemeral_public, recipient_public)?;
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), secret)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut sealed = Vec::with_capacity(PUBLIC_KEY_LEN + ciphertext.len());
    sealed.extend_from_slice(&ephemeral_public);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Open a box produced by [`seal_anonymous`].
pub fn open_sealed(sealed: &[u8], recipient_secret: &[u8; 32]) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() <= PUBLIC_KEY_LEN {
        return Err(CryptoError::Decryption);
    }
    let (eph, ciphertext) = sealed.split_at(PUBLIC_KEY_LEN);
    let mut ephemeral_public = [0u8; PUBLIC_KEY_LEN];
    ephemeral_public.copy_from_slice(eph);

    let recipient = StaticSecret::from(*recipient_secret);
    let recipient_public = PublicKey::from(&recipient).to_bytes();

    // X25519(recipient, eph_pk) == X25519(eph, recipient_pk)
    let (cipher, nonce) = box_cipher(
        &recipient,
        &ephemeral_public,
        &ephemeral_public,
        &recipient_public,
    )
    .map_err(|_| CryptoError::Decryption)?;
    cipher
        .decrypt(XNonce::from_slice(&nonce), ciphertext)
        .map_err(|_| CryptoError::Decryption)
}

fn box_cipher(
    our_secret: &StaticSecret,
    their_public: &[u8; 32],
    ephemeral_public: &[u8; 32],
    recipient_public: &[u8; 32],
) -> Result<(XChaCha20Poly1305, [u8; NONCE_LEN]), CryptoError> {
    let shared = our_secret.diffie_hellman(&PublicKey::from(*their_public));
    if !shared.was_contributory() {
        return Err(CryptoError::InvalidPublicKey);
    }

    let mut material = Vec::with_capacity(96);
    material.extend_from_slice(shared.as_bytes());
    material.extend_from_slice(ephemeral_public);
    material.extend_from_slice(recipient_public);
    let mut key = blake3_derive_key(SEAL_CONTEXT, &material);
    material.zeroize();

    let mut nonce_input = [0u8; 64];
    nonce_input[..32].copy_from_slice(ephemeral_public);
    nonce_input[32..].copy_from_slice(recipient_public);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&blake3::hash(&nonce_input).as_bytes()[..NONCE_LEN]);

    let cipher = XChaCha20Poly1305::new((&key).into());
    key.zeroize();
    Ok((cipher, nonce))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair(seed: u8) -> ([u8; 32], [u8; 32]) {
        let secret = [seed; 32];
        (secret, sealing_public_key(&secret))
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let (sk, pk) = keypair(7);
        let sealed = seal_anonymous(b"document key bytes", &pk).unwrap();
        assert_eq!(open_sealed(&sealed, &sk).unwrap(), b"document key bytes");
    }

    #[test]
    fn test_wrong_recipient_fails() {
        let (_, pk) = keypair(7);
        let (other_sk, _) = keypair(9);
        let sealed = seal_anonymous(b"secret", &pk).unwrap();
        assert_eq!(open_sealed(&sealed, &other_sk), Err(CryptoError::Decryption));
    }

    #[test]
    fn test_seals_are_randomized() {
        let (_, pk) = keypair(7);
        let a = seal_anonymous(b"secret", &pk).unwrap();
        let b = seal_anonymous(b"secret", &pk).unwrap();
        assert_ne!(a[..32], b[..32]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_tampered_box_fails() {
        let (sk, pk) = keypair(7);
        let mut sealed = seal_anonymous(b"secret", &pk).unwrap();
        sealed[40] ^= 1;
        assert_eq!(open_sealed(&sealed, &sk), Err(CryptoError::Decryption));
        assert_eq!(open_sealed(&sealed[..20], &sk), Err(CryptoError::Decryption));
    }

    #[test]
    fn test_low_order_recipient_rejected() {
        assert_eq!(
            seal_anonymous(b"secret", &[0u8; 32]),
            Err(CryptoError::InvalidPublicKey)
        );
    }
}
