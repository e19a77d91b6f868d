//! crypto/types.rs
//! Stable sizes and the crypto error type for the line-level AEAD envelope.

use std::fmt;

/// AES-256-GCM key length.
pub const KEY_LEN_32: usize = 32;

/// Standard 12-byte nonce length for AES-GCM.
pub const NONCE_LEN_12: usize = 12;

/// Fixed AEAD tag length (bytes).
pub const TAG_LEN: usize = 16;

/// Minimum length of a valid `nonce || ciphertext || tag` envelope.
pub const MIN_ENVELOPE_LEN: usize = NONCE_LEN_12 + TAG_LEN;

#[derive(Debug)]
pub enum CryptoError {
    /// Invalid key length provided at construction time. Distinct from runtime errors:
    /// this is a configuration mistake and should fail `init` loudly.
    InvalidKeyLen { expected: usize, actual: usize },

    /// AEAD tag mismatch or truncated envelope on decrypt.
    TagMismatch,

    /// Operation attempted after `dispose()` zeroized the key.
    Disposed,
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use CryptoError::*;
        match self {
            InvalidKeyLen { expected, actual } => {
                write!(f, "invalid key length: expected={expected}, actual={actual}")
            }
            TagMismatch => write!(f, "AEAD tag mismatch"),
            Disposed => write!(f, "encryptor has been disposed"),
        }
    }
}

impl std::error::Error for CryptoError {}
