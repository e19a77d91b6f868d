//! crypto/aead.rs
//! AES-256-GCM line encryption: one fresh random nonce per record, no AAD.
//!
//! Design notes:
//! - Output envelope is `nonce(12) || ciphertext || tag(16)`; every line decrypts
//!   independently of every other line.
//! - `dispose()` drops the key material; the `Zeroizing` wrapper overwrites the
//!   backing bytes with zeros before the allocation is freed.
//! - Tag verification is constant-time (delegated to the `aes-gcm` crate) and must
//!   fail closed: a tampered envelope or wrong key both surface as `TagMismatch`.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::crypto::types::{CryptoError, KEY_LEN_32, MIN_ENVELOPE_LEN, NONCE_LEN_12, TAG_LEN};

struct Inner {
    key: Zeroizing<[u8; KEY_LEN_32]>,
    cipher: Aes256Gcm,
}

/// AES-256-GCM encryptor for one engine's line-encryption key.
///
/// Constructing one requires exactly a 32-byte key; any other length is a
/// configuration error and should fail `init()` loudly, not surface as a
/// runtime `CryptoError` from the worker.
pub struct Encryptor {
    inner: Mutex<Option<Inner>>,
}

impl Encryptor {
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != KEY_LEN_32 {
            return Err(CryptoError::InvalidKeyLen {
                expected: KEY_LEN_32,
                actual: key.len(),
            });
        }
        let mut owned = [0u8; KEY_LEN_32];
        owned.copy_from_slice(key);
        let owned = Zeroizing::new(owned);
        let cipher = Aes256Gcm::new_from_slice(&owned[..]).map_err(|_| CryptoError::InvalidKeyLen {
            expected: KEY_LEN_32,
            actual: key.len(),
        })?;
        Ok(Self {
            inner: Mutex::new(Some(Inner { key: owned, cipher })),
        })
    }

    /// Encrypt `plaintext` under a fresh random nonce, returning `nonce||ciphertext||tag`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let guard = self.inner.lock();
        let inner = guard.as_ref().ok_or(CryptoError::Disposed)?;

        let mut nonce_bytes = [0u8; NONCE_LEN_12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = inner
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| CryptoError::TagMismatch)?;

        let mut out = Vec::with_capacity(NONCE_LEN_12 + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Encrypt and base64-encode, producing one storable text line.
    pub fn encrypt_to_line(&self, plaintext: &[u8]) -> Result<String, CryptoError> {
        self.encrypt(plaintext).map(|bytes| BASE64.encode(bytes))
    }

    /// Decrypt a raw `nonce||ciphertext||tag` envelope.
    pub fn decrypt(&self, envelope: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let guard = self.inner.lock();
        let inner = guard.as_ref().ok_or(CryptoError::Disposed)?;

        if envelope.len() < MIN_ENVELOPE_LEN {
            return Err(CryptoError::TagMismatch);
        }
        let (nonce_bytes, ciphertext_and_tag) = envelope.split_at(NONCE_LEN_12);
        let nonce = Nonce::from_slice(nonce_bytes);
        inner
            .cipher
            .decrypt(nonce, ciphertext_and_tag)
            .map_err(|_| CryptoError::TagMismatch)
    }

    /// Decode a base64 line, then decrypt it.
    pub fn decrypt_line(&self, line: &str) -> Result<Vec<u8>, CryptoError> {
        let bytes = BASE64
            .decode(line.trim_end())
            .map_err(|_| CryptoError::TagMismatch)?;
        self.decrypt(&bytes)
    }

    /// Overwrite the key material with zeros. Subsequent encrypt/decrypt calls fail
    /// with `CryptoError::Disposed`.
    pub fn dispose(&self) {
        let mut guard = self.inner.lock();
        *guard = None;
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lock().is_none()
    }
}

#[allow(dead_code)]
const _TAG_LEN_CHECK: usize = TAG_LEN;

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> Vec<u8> {
        b"12345678901234567890123456789012".to_vec()
    }

    #[test]
    fn rejects_wrong_key_length() {
        let err = Encryptor::new(&[0u8; 16]).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKeyLen { expected: 32, actual: 16 }));
    }

    #[test]
    fn round_trips_plaintext() {
        let enc = Encryptor::new(&key()).unwrap();
        let envelope = enc.encrypt(b"hello world").unwrap();
        let plain = enc.decrypt(&envelope).unwrap();
        assert_eq!(plain, b"hello world");
    }

    #[test]
    fn same_plaintext_twice_produces_different_envelopes() {
        let enc = Encryptor::new(&key()).unwrap();
        let a = enc.encrypt(b"same message").unwrap();
        let b = enc.encrypt(b"same message").unwrap();
        assert_ne!(a, b);
        assert_eq!(enc.decrypt(&a).unwrap(), b"same message");
        assert_eq!(enc.decrypt(&b).unwrap(), b"same message");
    }

    #[test]
    fn short_envelope_is_rejected() {
        let enc = Encryptor::new(&key()).unwrap();
        assert!(matches!(enc.decrypt(&[0u8; 10]), Err(CryptoError::TagMismatch)));
    }

    #[test]
    fn tampered_ciphertext_fails_tag_check() {
        let enc = Encryptor::new(&key()).unwrap();
        let mut envelope = enc.encrypt(b"integrity matters").unwrap();
        let last = envelope.len() - 1;
        envelope[last] ^= 0xFF;
        assert!(matches!(enc.decrypt(&envelope), Err(CryptoError::TagMismatch)));
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let enc_a = Encryptor::new(&key()).unwrap();
        let enc_b = Encryptor::new(&[9u8; 32]).unwrap();
        let envelope = enc_a.encrypt(b"secret").unwrap();
        assert!(matches!(enc_b.decrypt(&envelope), Err(CryptoError::TagMismatch)));
    }

    #[test]
    fn disposed_encryptor_rejects_further_use() {
        let enc = Encryptor::new(&key()).unwrap();
        enc.dispose();
        assert!(enc.is_disposed());
        assert!(matches!(enc.encrypt(b"x"), Err(CryptoError::Disposed)));
        assert!(matches!(enc.decrypt(&[0u8; 30]), Err(CryptoError::Disposed)));
    }

    #[test]
    fn line_round_trip_via_base64() {
        let enc = Encryptor::new(&key()).unwrap();
        let line = enc.encrypt_to_line(b"line payload").unwrap();
        assert_eq!(enc.decrypt_line(&line).unwrap(), b"line payload");
    }
}
