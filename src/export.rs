//! export.rs
//! The read-path contract shared with the (out-of-scope) export/archive collaborator.
//!
//! This module does not gzip or package anything — that is the collaborator's job.
//! It exposes the directory, the active key, and the active format, and it performs
//! the one piece of logic that must live in the core regardless: streaming,
//! line-by-line decryption bounded by an uncompressed size ceiling.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::crypto::Encryptor;
use crate::error::{EngineError, EngineResult};
use crate::format::FormatKind;
use crate::rotation::CURRENT_LOG_NAME;

pub const MAX_EXPORT_BYTES: u64 = 50 * 1024 * 1024;

pub struct ExportHandle {
    directory: PathBuf,
    encryption_key: Option<Vec<u8>>,
    format: FormatKind,
}

impl ExportHandle {
    pub fn new(directory: PathBuf, encryption_key: Option<Vec<u8>>, format: FormatKind) -> Self {
        ExportHandle {
            directory,
            encryption_key,
            format,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn format(&self) -> &FormatKind {
        &self.format
    }

    pub fn has_encryption(&self) -> bool {
        self.encryption_key.is_some()
    }

    /// Streams every `*.log` file (`current.log` first, then backups oldest-index
    /// first), decrypting line-by-line when a key is configured. Stops and raises
    /// `ExportTooLarge` as soon as accumulated uncompressed bytes would exceed
    /// `MAX_EXPORT_BYTES`.
    pub fn export_lines(&self) -> EngineResult<Vec<String>> {
        let encryptor = match &self.encryption_key {
            Some(key) => Some(Encryptor::new(key).map_err(EngineError::from)?),
            None => None,
        };

        let mut out = Vec::new();
        let mut total_bytes: u64 = 0;

        for path in self.ordered_log_files()? {
            let file = File::open(&path).map_err(EngineError::WriteFailure)?;
            for line in BufReader::new(file).lines() {
                let line = line.map_err(EngineError::WriteFailure)?;
                let decoded = match &encryptor {
                    Some(enc) => {
                        let bytes = enc.decrypt_line(&line).map_err(EngineError::from)?;
                        String::from_utf8(bytes)
                            .map_err(|_| EngineError::Validation("decrypted line is not valid utf-8".into()))?
                    }
                    None => line,
                };
                total_bytes += decoded.len() as u64;
                if total_bytes > MAX_EXPORT_BYTES {
                    return Err(EngineError::ExportTooLarge { limit: MAX_EXPORT_BYTES });
                }
                out.push(decoded);
            }
        }
        Ok(out)
    }

    fn ordered_log_files(&self) -> EngineResult<Vec<PathBuf>> {
        let mut backups = Vec::new();
        let current = self.directory.join(CURRENT_LOG_NAME);

        let entries = match std::fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(EngineError::WriteFailure(e)),
        };
        for entry in entries {
            let entry = entry.map_err(EngineError::WriteFailure)?;
            let path = entry.path();
            if path == current {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) == Some("log") {
                backups.push(path);
            }
        }
        backups.sort();

        let mut out = Vec::new();
        if current.exists() {
            out.push(current);
        }
        out.extend(backups);
        Ok(out)
    }
}
