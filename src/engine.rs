//! engine.rs
//! The process-wide log engine: ingestion, flush scheduling, and the worker pipeline.
//!
//! The engine is a process-wide resource with explicit `init`/`dispose`, kept behind
//! a global slot (`GLOBAL`) so the free functions in `lib.rs` have somewhere to reach.
//! Re-entrant `init()` calls are serialized by `INIT_LOCK` and are idempotent once an
//! engine exists; `dispose()` clears the slot after one final flush.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex as StdMutex, OnceLock};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::buffer::RecordBuffer;
use crate::config::Config;
use crate::context::ContextValue;
use crate::crypto::Encryptor;
use crate::error::{EngineError, EngineResult};
use crate::export::ExportHandle;
use crate::format::{formatter_for, resolve_for_worker};
use crate::level::Level;
use crate::record::Record;
use crate::redact::{RedactionPattern, Redactor};
use crate::rotation;
use crate::sinks::call_sink;
use crate::stats::{scan_directory, Counters, StatsSnapshot};

const MAX_RUNTIME_PATTERNS: usize = 100;

enum FlushSignal {
    Demand,
    Stop,
}

pub struct LogEngine {
    enabled: bool,
    active_min_level: AtomicU8,
    sensitive_mode: AtomicBool,

    buffer: Mutex<RecordBuffer>,
    buffer_size: usize,
    sequence: AtomicU64,

    session_id: String,
    directory: PathBuf,
    directory_ok: AtomicBool,

    flush_interval: Duration,
    format: crate::format::FormatKind,
    rotation: crate::config::RotationConfig,
    retention: Option<crate::config::RetentionConfig>,

    configured_patterns: Vec<RedactionPattern>,
    runtime_patterns: Mutex<VecDeque<RedactionPattern>>,

    encryption_key: Option<Vec<u8>>,
    encryptor: Option<Encryptor>,

    context_providers: Vec<crate::config::ContextProvider>,
    hooks: crate::hooks::Hooks,
    sinks: Vec<Box<dyn crate::sinks::Sink>>,

    counters: Counters,
    flush_lock: Mutex<()>,
    flush_tx: Sender<FlushSignal>,
    scheduler_handle: StdMutex<Option<JoinHandle<()>>>,
    cleanup_tx: StdMutex<Option<Sender<()>>>,
    cleanup_handle: StdMutex<Option<JoinHandle<()>>>,

    disposed: AtomicBool,
}

static GLOBAL: OnceLock<Mutex<Option<Arc<LogEngine>>>> = OnceLock::new();
static INIT_LOCK: Mutex<()> = Mutex::new(());

fn global_slot() -> &'static Mutex<Option<Arc<LogEngine>>> {
    GLOBAL.get_or_init(|| Mutex::new(None))
}

/// Initializes the process-wide engine. Idempotent: a second `init()` call while
/// one is already live returns the existing instance untouched (same `sessionId`,
/// same counters).
pub fn init(config: Config) -> EngineResult<Arc<LogEngine>> {
    let _guard = INIT_LOCK.lock();
    if let Some(existing) = global_slot().lock().clone() {
        return Ok(existing);
    }
    let (engine, flush_rx) = LogEngine::build(config)?;
    let engine = Arc::new(engine);
    engine.spawn_background_threads(&engine, flush_rx);
    *global_slot().lock() = Some(engine.clone());
    Ok(engine)
}

pub fn current() -> Option<Arc<LogEngine>> {
    global_slot().lock().clone()
}

/// Runs one final flush, cancels the background timers, and clears the global slot.
pub fn dispose() -> EngineResult<()> {
    let _guard = INIT_LOCK.lock();
    let engine = global_slot().lock().take();
    if let Some(engine) = engine {
        engine.shutdown()?;
    }
    Ok(())
}

impl LogEngine {
    fn build(config: Config) -> EngineResult<(LogEngine, Receiver<FlushSignal>)> {
        if let Some(key) = &config.encryption_key {
            if key.len() != crate::crypto::KEY_LEN_32 {
                return Err(EngineError::Config(format!(
                    "encryption key must be {} bytes, got {}",
                    crate::crypto::KEY_LEN_32,
                    key.len()
                )));
            }
        }
        let encryptor = match &config.encryption_key {
            Some(key) => Some(Encryptor::new(key).map_err(EngineError::from)?),
            None => None,
        };

        let directory_ok = match std::fs::create_dir_all(&config.directory) {
            Ok(()) => true,
            Err(e) => {
                config.hooks.fire_on_error(&e.to_string(), "init: directory unavailable");
                false
            }
        };

        let (flush_tx, flush_rx) = bounded(64);

        let engine = LogEngine {
            enabled: config.enabled,
            active_min_level: AtomicU8::new(config.min_level.numeric()),
            sensitive_mode: AtomicBool::new(config.sensitive_mode),
            buffer: Mutex::new(RecordBuffer::new(config.buffer_size)),
            buffer_size: config.buffer_size,
            sequence: AtomicU64::new(0),
            session_id: generate_session_id(),
            directory: config.directory,
            directory_ok: AtomicBool::new(directory_ok),
            flush_interval: config.flush_interval,
            format: config.format,
            rotation: config.rotation,
            retention: config.retention,
            configured_patterns: config.redaction_patterns,
            runtime_patterns: Mutex::new(VecDeque::new()),
            encryption_key: config.encryption_key,
            encryptor,
            context_providers: config.context_providers,
            hooks: config.hooks,
            sinks: config.sinks,
            counters: Counters::new(),
            flush_lock: Mutex::new(()),
            flush_tx,
            scheduler_handle: StdMutex::new(None),
            cleanup_tx: StdMutex::new(None),
            cleanup_handle: StdMutex::new(None),
            disposed: AtomicBool::new(false),
        };

        Ok((engine, flush_rx))
    }

    fn spawn_background_threads(&self, shared: &Arc<LogEngine>, flush_rx: Receiver<FlushSignal>) {
        let engine = shared.clone();
        let interval = self.flush_interval;
        let handle = std::thread::Builder::new()
            .name("nightlog-scheduler".into())
            .spawn(move || scheduler_loop(engine, flush_rx, interval))
            .expect("spawning the flush scheduler thread");
        *self.scheduler_handle.lock().unwrap() = Some(handle);

        if let Some(retention) = &self.retention {
            let (tx, rx) = bounded::<()>(1);
            let engine = shared.clone();
            let interval = retention.cleanup_interval;
            let handle = std::thread::Builder::new()
                .name("nightlog-retention".into())
                .spawn(move || cleanup_loop(engine, rx, interval))
                .expect("spawning the retention cleanup thread");
            *self.cleanup_tx.lock().unwrap() = Some(tx);
            *self.cleanup_handle.lock().unwrap() = Some(handle);
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn directory(&self) -> &std::path::Path {
        &self.directory
    }

    /// Overrides the active minimum level at runtime; this takes precedence over
    /// whatever `minLevel` the engine was configured with.
    pub fn set_active_min_level(&self, level: Level) {
        self.active_min_level.store(level.numeric(), Ordering::SeqCst);
    }

    pub fn set_sensitive_mode(&self, on: bool) {
        self.sensitive_mode.store(on, Ordering::SeqCst);
    }

    pub fn add_runtime_redaction_pattern(&self, pattern: RedactionPattern) {
        let mut patterns = self.runtime_patterns.lock();
        if patterns.len() >= MAX_RUNTIME_PATTERNS {
            patterns.pop_front();
        }
        patterns.push_back(pattern);
    }

    /// The public, statically-typed entry point: `log(level, message, context?)`.
    pub fn log(&self, level: Level, message: &str, context: Option<ContextValue>) {
        self.log_in(level, "default", message, context);
    }

    /// `logIn(level, category, message, context?)` — the category-qualified entry point.
    pub fn log_in(&self, level: Level, category: &str, message: &str, context: Option<ContextValue>) {
        if !self.enabled {
            return;
        }
        if self.sensitive_mode.load(Ordering::SeqCst) {
            return;
        }
        if level.numeric() < self.active_min_level.load(Ordering::SeqCst) {
            return;
        }

        let merged_context = self.merge_context(context);
        let sanitized = merged_context.and_then(|ctx| crate::context::sanitize(&ctx));

        let timestamp = chrono::Utc::now();
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let record = Record::new(timestamp, level, category, message, sanitized, self.session_id.clone(), seq);

        let (dropped, buffer_len) = {
            let mut buffer = self.buffer.lock();
            let dropped = buffer.push(record.clone());
            (dropped, buffer.len())
        };
        self.counters.record_logged();
        self.counters.record_dropped(dropped as u64);

        self.hooks.fire_on_log(&record);
        for sink in &self.sinks {
            call_sink(sink.as_ref(), &record);
        }

        if buffer_len >= self.buffer_size || level.is_critical() {
            let _ = self.flush_tx.try_send(FlushSignal::Demand);
        }
    }

    fn merge_context(&self, caller_context: Option<ContextValue>) -> Option<ContextValue> {
        let mut base: Vec<(String, ContextValue)> = match caller_context {
            Some(ContextValue::Map(pairs)) => pairs,
            Some(other) => vec![("value".to_string(), other)],
            None => Vec::new(),
        };

        for provider in &self.context_providers {
            let produced = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| provider()))
                .ok()
                .flatten();
            if let Some(pairs) = produced {
                crate::context::merge_maps(&mut base, pairs);
            }
        }

        if base.is_empty() {
            None
        } else {
            Some(ContextValue::Map(base))
        }
    }

    /// Forces one synchronous flush batch under the flush lock. May block the
    /// calling thread on I/O.
    pub fn flush(&self) -> EngineResult<usize> {
        let _guard = self.flush_lock.lock();
        self.run_batch_locked()
    }

    fn run_batch_locked(&self) -> EngineResult<usize> {
        if !self.directory_ok.load(Ordering::SeqCst) {
            return Ok(0);
        }

        let snapshot = {
            let mut buffer = self.buffer.lock();
            buffer.drain_all()
        };
        if snapshot.is_empty() {
            return Ok(0);
        }

        if let Err(e) = std::fs::create_dir_all(&self.directory) {
            self.restore(snapshot);
            self.counters.record_write_failure();
            self.hooks.fire_on_error(&e.to_string(), "flush: create_dir_all failed");
            return Err(EngineError::DirectoryUnavailable(e));
        }

        let effective_patterns = self.effective_patterns();
        let redactor = Redactor::new(effective_patterns);
        let resolved_format = resolve_for_worker(&self.format);
        let formatter = formatter_for(&resolved_format);

        if let Err(e) = self.write_batch(&snapshot, &redactor, formatter.as_ref()) {
            self.restore(snapshot);
            self.counters.record_write_failure();
            self.hooks.fire_on_error(&e.to_string(), "flush: write failed");
            return Err(e);
        }

        let count = snapshot.len();
        self.hooks.fire_on_flush(count);

        if let Err(e) = self.run_rotation() {
            // RotationFailure is swallowed inside the worker; logging continues.
            self.hooks.fire_on_error(&e.to_string(), "flush: rotation failed");
        }

        Ok(count)
    }

    fn effective_patterns(&self) -> Vec<RedactionPattern> {
        let mut patterns = self.configured_patterns.clone();
        patterns.extend(self.runtime_patterns.lock().iter().cloned());
        patterns
    }

    fn write_batch(
        &self,
        snapshot: &[Record],
        redactor: &Redactor,
        formatter: &dyn crate::format::Formatter,
    ) -> EngineResult<()> {
        let current_path = self.directory.join(rotation::CURRENT_LOG_NAME);
        let needs_header = matches!(self.format, crate::format::FormatKind::Csv)
            && std::fs::metadata(&current_path).map(|m| m.len() == 0).unwrap_or(true);

        let mut lines = Vec::with_capacity(snapshot.len() + 1);
        if needs_header {
            lines.push(crate::format::CSV_HEADER.to_string());
        }
        for record in snapshot {
            let redacted = redactor.redact(record);
            let formatted = formatter.format(&redacted);
            let line = match &self.encryptor {
                Some(enc) => enc.encrypt_to_line(formatted.as_bytes()).map_err(EngineError::from)?,
                None => formatted,
            };
            lines.push(line);
        }

        use std::fs::OpenOptions;
        use std::io::Write;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&current_path)
            .map_err(EngineError::WriteFailure)?;
        let mut payload = lines.join("\n");
        payload.push('\n');
        file.write_all(payload.as_bytes()).map_err(EngineError::WriteFailure)?;
        Ok(())
    }

    fn run_rotation(&self) -> EngineResult<()> {
        let rotated = match self.rotation.strategy {
            crate::config::RotationStrategy::MultiFile => {
                rotation::maybe_rotate_multi_file(&self.directory, self.rotation.max_file_size, self.rotation.max_files)
                    .map_err(EngineError::Rotation)?
            }
            crate::config::RotationStrategy::SingleFile => {
                rotation::maybe_trim_single_file(&self.directory, self.rotation.max_file_size, self.rotation.trim_percent)
                    .map_err(EngineError::Rotation)?
            }
        };
        if rotated {
            self.hooks.fire_on_rotate();
        }
        Ok(())
    }

    fn restore(&self, snapshot: Vec<Record>) {
        let dropped = self.buffer.lock().restore_to_head(snapshot);
        self.counters.record_dropped(dropped as u64);
    }

    pub fn export_handle(&self) -> ExportHandle {
        ExportHandle::new(self.directory.clone(), self.encryption_key.clone(), self.format.clone())
    }

    pub fn export(&self) -> EngineResult<Vec<String>> {
        self.export_handle().export_lines()
    }

    pub fn clear(&self) -> EngineResult<()> {
        let _guard = self.flush_lock.lock();
        rotation::clear_all_logs(&self.directory).map_err(EngineError::WriteFailure)?;
        self.buffer.lock().clear();
        Ok(())
    }

    pub fn get_stats(&self) -> EngineResult<StatsSnapshot> {
        let dir_stats = scan_directory(&self.directory).map_err(EngineError::WriteFailure)?;
        Ok(StatsSnapshot {
            total_logged: self.counters.total_logged(),
            buffered_count: self.buffer.lock().len(),
            dropped_count: self.counters.dropped_count(),
            write_failures: self.counters.write_failures(),
            session_id: self.session_id.clone(),
            storage_used: dir_stats.storage_used,
            file_count: dir_stats.file_count,
            oldest_entry: dir_stats.oldest_entry,
            newest_entry: dir_stats.newest_entry,
        })
    }

    fn shutdown(&self) -> EngineResult<()> {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let result = self.flush();

        let _ = self.flush_tx.send(FlushSignal::Stop);
        if let Some(handle) = self.scheduler_handle.lock().unwrap().take() {
            let _ = handle.join();
        }
        if let Some(tx) = self.cleanup_tx.lock().unwrap().take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.cleanup_handle.lock().unwrap().take() {
            let _ = handle.join();
        }
        if let Some(enc) = &self.encryptor {
            enc.dispose();
        }
        result.map(|_| ())
    }
}

fn scheduler_loop(engine: Arc<LogEngine>, rx: Receiver<FlushSignal>, interval: Duration) {
    loop {
        match rx.recv_timeout(interval) {
            Ok(FlushSignal::Demand) => {
                let _guard = engine.flush_lock.lock();
                let _ = engine.run_batch_locked();
            }
            Ok(FlushSignal::Stop) => break,
            Err(RecvTimeoutError::Timeout) => {
                let _guard = engine.flush_lock.lock();
                let _ = engine.run_batch_locked();
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn cleanup_loop(engine: Arc<LogEngine>, rx: Receiver<()>, interval: Duration) {
    loop {
        match rx.recv_timeout(interval) {
            Ok(()) => break,
            Err(RecvTimeoutError::Timeout) => {
                if let Some(retention) = &engine.retention {
                    let _ = rotation::cleanup_retention(&engine.directory, retention.max_age, retention.min_entries);
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn generate_session_id() -> String {
    let millis = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
    format!("sess_{}", to_base36(millis))
}

fn to_base36(mut n: u128) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ascii")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_have_the_documented_prefix() {
        let id = generate_session_id();
        assert!(id.starts_with("sess_"));
    }

    #[test]
    fn base36_round_trips_small_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
