//! error.rs
//! Unified engine error covering configuration, I/O, and crypto failures.
//!
//! Ergonomic `From<T>` impls enable `?` across the engine.
//! None of these ever reach a caller from the ingest path (see `engine.rs`);
//! they surface only from `flush`, `export`, `clear`, `get_stats`, and `init`.

use std::fmt;
use std::io;

use crate::crypto::CryptoError;

/// Errors raised by explicit engine operations.
#[derive(Debug)]
pub enum EngineError {
    /// A configuration value is unusable (bad key length, nonsense sizes). `init` fails loudly.
    Config(String),

    /// The log directory could not be created. `init` still succeeds, but the engine
    /// runs memory-only: flushes are no-ops until the directory becomes reachable.
    DirectoryUnavailable(io::Error),

    /// Append, rotation rename, or file creation failed mid-flush.
    WriteFailure(io::Error),

    /// Rename/delete failed partway through a rotation ring shuffle.
    Rotation(io::Error),

    /// AEAD tag mismatch or wrong key on decrypt.
    Crypto(CryptoError),

    /// `export` would exceed the uncompressed size ceiling.
    ExportTooLarge { limit: u64 },

    /// Generic validation failure with context.
    Validation(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Config(msg) => write!(f, "configuration error: {msg}"),
            EngineError::DirectoryUnavailable(e) => write!(f, "log directory unavailable: {e}"),
            EngineError::WriteFailure(e) => write!(f, "write failure: {e}"),
            EngineError::Rotation(e) => write!(f, "rotation failure: {e}"),
            EngineError::Crypto(e) => write!(f, "crypto failure: {e}"),
            EngineError::ExportTooLarge { limit } => {
                write!(f, "export exceeds uncompressed cap of {limit} bytes")
            }
            EngineError::Validation(msg) => write!(f, "validation error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<CryptoError> for EngineError {
    fn from(e: CryptoError) -> Self {
        EngineError::Crypto(e)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
