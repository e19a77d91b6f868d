//! rotation.rs
//! Multi-file ring rotation, single-file head-trim, and age-based retention cleanup.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

pub const CURRENT_LOG_NAME: &str = "current.log";

fn backup_name(index: usize) -> String {
    format!("backup_{index}.log")
}

/// Runs the multi-file ring shuffle if `current.log` has reached `max_file_size`.
/// Returns whether a rotation actually happened (so the caller knows whether to
/// fire `onRotate`).
pub fn maybe_rotate_multi_file(dir: &Path, max_file_size: u64, max_files: usize) -> io::Result<bool> {
    let current = dir.join(CURRENT_LOG_NAME);
    let size = match fs::metadata(&current) {
        Ok(meta) => meta.len(),
        Err(_) => return Ok(false),
    };
    if size < max_file_size {
        return Ok(false);
    }
    rotate_multi_file_ring(dir, max_files)?;
    Ok(true)
}

/// The rename sequence below is not a single atomic unit and can leave gaps on a
/// crash between steps; that weakening is accepted rather than strengthened.
fn rotate_multi_file_ring(dir: &Path, max_files: usize) -> io::Result<()> {
    let current = dir.join(CURRENT_LOG_NAME);

    if max_files <= 1 {
        let _ = fs::remove_file(&current);
        File::create(&current)?;
        return Ok(());
    }

    let last = max_files - 1;
    let last_backup = dir.join(backup_name(last));
    if last_backup.exists() {
        fs::remove_file(&last_backup)?;
    }
    for i in (1..last).rev() {
        let from = dir.join(backup_name(i));
        if from.exists() {
            fs::rename(&from, dir.join(backup_name(i + 1)))?;
        }
    }
    fs::rename(&current, dir.join(backup_name(1)))?;
    File::create(&current)?;
    Ok(())
}

/// Runs the single-file head-trim if `current.log` has reached `max_file_size`.
pub fn maybe_trim_single_file(dir: &Path, max_file_size: u64, trim_percent: u8) -> io::Result<bool> {
    let current = dir.join(CURRENT_LOG_NAME);
    let size = match fs::metadata(&current) {
        Ok(meta) => meta.len(),
        Err(_) => return Ok(false),
    };
    if size < max_file_size {
        return Ok(false);
    }
    trim_single_file(&current, trim_percent);
    Ok(true)
}

fn trim_single_file(path: &Path, trim_percent: u8) {
    let lines = match read_lines_streaming(path) {
        Ok(lines) => lines,
        Err(_) => {
            let _ = File::create(path);
            return;
        }
    };

    let total = lines.len();
    if total == 0 {
        return;
    }

    let mut lines_to_remove = ((total as f64) * (trim_percent as f64) / 100.0).ceil() as usize;
    if lines_to_remove >= total {
        let keep = ((total as f64) * 0.10).ceil() as usize;
        lines_to_remove = total.saturating_sub(keep);
    }

    if rewrite_tail(path, &lines[lines_to_remove..]).is_err() {
        let _ = File::create(path);
    }
}

fn read_lines_streaming(path: &Path) -> io::Result<Vec<String>> {
    let file = File::open(path)?;
    BufReader::new(file).lines().collect()
}

fn rewrite_tail(path: &Path, lines: &[String]) -> io::Result<()> {
    let tmp = path.with_extension("log.tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        for line in lines {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)
}

struct LogFile {
    path: PathBuf,
    mtime: SystemTime,
    entries: usize,
}

fn list_log_files(dir: &Path) -> io::Result<Vec<LogFile>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("log") {
            continue;
        }
        let meta = entry.metadata()?;
        let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let entries = count_lines(&path).unwrap_or(0);
        out.push(LogFile { path, mtime, entries });
    }
    Ok(out)
}

fn count_lines(path: &Path) -> io::Result<usize> {
    let file = File::open(path)?;
    Ok(BufReader::new(file).lines().count())
}

/// Deletes files older than `max_age`, oldest-first, stopping as soon as deleting
/// the next file would leave fewer than `min_entries` total records across the
/// directory.
pub fn cleanup_retention(dir: &Path, max_age: Duration, min_entries: usize) -> io::Result<Vec<PathBuf>> {
    let mut files = list_log_files(dir)?;
    files.sort_by_key(|f| f.mtime);

    let mut total_entries: usize = files.iter().map(|f| f.entries).sum();
    let now = SystemTime::now();
    let mut deleted = Vec::new();

    for file in files {
        let age = now.duration_since(file.mtime).unwrap_or(Duration::ZERO);
        let would_remain = total_entries.saturating_sub(file.entries);
        if age < max_age || would_remain < min_entries {
            break;
        }
        fs::remove_file(&file.path)?;
        total_entries = would_remain;
        deleted.push(file.path);
    }
    Ok(deleted)
}

/// Deletes every `*.log` file in `dir`.
pub fn clear_all_logs(dir: &Path) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("log") {
            fs::remove_file(path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::tempdir;

    fn write_current(dir: &Path, bytes: usize) {
        let mut f = File::create(dir.join(CURRENT_LOG_NAME)).unwrap();
        f.write_all(&vec![b'a'; bytes]).unwrap();
    }

    #[test]
    fn multi_file_rotation_shuffles_backups_and_resets_current() {
        let dir = tempdir().unwrap();
        write_current(dir.path(), 10);
        let rotated = maybe_rotate_multi_file(dir.path(), 5, 3).unwrap();
        assert!(rotated);
        assert!(dir.path().join(backup_name(1)).exists());
        assert_eq!(fs::metadata(dir.path().join(CURRENT_LOG_NAME)).unwrap().len(), 0);
    }

    #[test]
    fn ring_never_exceeds_max_files() {
        let dir = tempdir().unwrap();
        for _ in 0..5 {
            write_current(dir.path(), 10);
            maybe_rotate_multi_file(dir.path(), 5, 3).unwrap();
        }
        let count = fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().path().extension().map(|x| x == "log").unwrap_or(false))
            .count();
        assert!(count <= 3);
        assert!(!dir.path().join(backup_name(3)).exists());
    }

    #[test]
    fn single_file_trim_keeps_the_tail() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CURRENT_LOG_NAME);
        {
            let mut f = File::create(&path).unwrap();
            for i in 0..100 {
                writeln!(f, "entry {i}").unwrap();
            }
        }
        let size_before = fs::metadata(&path).unwrap().len();
        let trimmed = maybe_trim_single_file(dir.path(), size_before - 1, 30).unwrap();
        assert!(trimmed);
        let contents = fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("entry 0\n"));
        assert!(contents.contains("entry 99"));
    }

    #[test]
    fn retention_stops_at_min_entries_floor() {
        let dir = tempdir().unwrap();
        for i in 0..3 {
            let mut f = File::create(dir.path().join(format!("backup_{i}.log"))).unwrap();
            writeln!(f, "a\nb").unwrap();
        }
        let deleted = cleanup_retention(dir.path(), Duration::from_secs(0), 4).unwrap();
        // Each file has 2 entries; total is 6; floor is 4, so at most one file can go.
        assert!(deleted.len() <= 1);
    }
}
