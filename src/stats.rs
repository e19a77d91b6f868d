//! stats.rs
//! Counters maintained across the engine's lifetime, plus an on-demand directory scan.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

#[derive(Default)]
pub struct Counters {
    total_logged: AtomicU64,
    dropped_count: AtomicU64,
    write_failures: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Counters::default()
    }

    pub fn record_logged(&self) {
        self.total_logged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self, n: u64) {
        if n > 0 {
            self.dropped_count.fetch_add(n, Ordering::Relaxed);
        }
    }

    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_logged(&self) -> u64 {
        self.total_logged.load(Ordering::Relaxed)
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryStats {
    pub storage_used: u64,
    pub file_count: usize,
    pub oldest_entry: Option<SystemTime>,
    pub newest_entry: Option<SystemTime>,
}

/// Scans `dir` for `*.log` files and summarizes size and age.
pub fn scan_directory(dir: &Path) -> io::Result<DirectoryStats> {
    let mut storage_used = 0u64;
    let mut file_count = 0usize;
    let mut oldest: Option<SystemTime> = None;
    let mut newest: Option<SystemTime> = None;

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Ok(DirectoryStats {
                storage_used: 0,
                file_count: 0,
                oldest_entry: None,
                newest_entry: None,
            })
        }
        Err(e) => return Err(e),
    };

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("log") {
            continue;
        }
        let meta = entry.metadata()?;
        storage_used += meta.len();
        file_count += 1;
        if let Ok(mtime) = meta.modified() {
            oldest = Some(oldest.map_or(mtime, |o| o.min(mtime)));
            newest = Some(newest.map_or(mtime, |n| n.max(mtime)));
        }
    }

    Ok(DirectoryStats {
        storage_used,
        file_count,
        oldest_entry: oldest,
        newest_entry: newest,
    })
}

#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub total_logged: u64,
    pub buffered_count: usize,
    pub dropped_count: u64,
    pub write_failures: u64,
    pub session_id: String,
    pub storage_used: u64,
    pub file_count: usize,
    pub oldest_entry: Option<SystemTime>,
    pub newest_entry: Option<SystemTime>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn scanning_an_absent_directory_is_not_an_error() {
        let stats = scan_directory(Path::new("/no/such/directory/ever")).unwrap();
        assert_eq!(stats.file_count, 0);
    }

    #[test]
    fn scanning_sums_sizes_across_log_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("current.log"), b"hello").unwrap();
        fs::write(dir.path().join("backup_1.log"), b"world!").unwrap();
        fs::write(dir.path().join("ignore.txt"), b"nope").unwrap();
        let stats = scan_directory(dir.path()).unwrap();
        assert_eq!(stats.file_count, 2);
        assert_eq!(stats.storage_used, 11);
    }

    #[test]
    fn counters_accumulate() {
        let counters = Counters::new();
        counters.record_logged();
        counters.record_logged();
        counters.record_dropped(3);
        counters.record_write_failure();
        assert_eq!(counters.total_logged(), 2);
        assert_eq!(counters.dropped_count(), 3);
        assert_eq!(counters.write_failures(), 1);
    }
}
