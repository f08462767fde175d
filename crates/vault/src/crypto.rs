//! Symmetric encryption of sensitive vault fields.
//!
//! AES-256-GCM with a random 96-bit nonce per encryption; the stored form is
//! `hex(nonce || ciphertext)`. GCM authenticates the ciphertext, so a
//! decryption attempt with a key other than the one that wrote the record
//! fails cleanly; that failure is surfaced as [`DomainError::WrongKey`],
//! never as garbage plaintext.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};

use railshop_core::{DomainError, DomainResult};

const NONCE_LEN: usize = 12;

/// Caller-supplied 256-bit symmetric key.
///
/// Key provisioning is an out-of-scope collaborator concern; the vault only
/// requires that the same key bytes are presented for write and read.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

impl core::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// Encrypt `plaintext` for at-rest storage.
pub fn encrypt(plaintext: &str, key: &EncryptionKey) -> DomainResult<String> {
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = key
        .cipher()
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|_| DomainError::store("vault encryption failed"))?;

    let mut raw = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    raw.extend_from_slice(nonce.as_slice());
    raw.extend_from_slice(&ciphertext);
    Ok(hex::encode(raw))
}

/// Decrypt a stored `hex(nonce || ciphertext)` value.
///
/// A malformed stored value is an integrity failure (`Store`); an
/// authentication failure means the key does not match the record and is
/// reported as `WrongKey`.
pub fn decrypt(encoded: &str, key: &EncryptionKey) -> DomainResult<String> {
    let raw = hex::decode(encoded)
        .map_err(|_| DomainError::store("vault ciphertext is not valid hex"))?;
    if raw.len() <= NONCE_LEN {
        return Err(DomainError::store("vault ciphertext is truncated"));
    }

    let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
    let plaintext = key
        .cipher()
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| DomainError::WrongKey)?;

    String::from_utf8(plaintext)
        .map_err(|_| DomainError::store("decrypted vault payload is not UTF-8"))
}
