//! config.rs
//! All engine configuration in one place, per the data model's option table.

use std::path::PathBuf;
use std::time::Duration;

use crate::context::ContextValue;
use crate::format::FormatKind;
use crate::hooks::Hooks;
use crate::level::Level;
use crate::redact::RedactionPattern;
use crate::sinks::Sink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStrategy {
    MultiFile,
    SingleFile,
}

#[derive(Debug, Clone)]
pub struct RotationConfig {
    pub strategy: RotationStrategy,
    pub max_file_size: u64,
    /// Ring size for `MultiFile`, including `current.log`. Ignored for `SingleFile`.
    pub max_files: usize,
    /// Head-trim fraction (0..=100) for `SingleFile`. Ignored for `MultiFile`.
    pub trim_percent: u8,
}

impl Default for RotationConfig {
    fn default() -> Self {
        RotationConfig {
            strategy: RotationStrategy::MultiFile,
            max_file_size: 10 * 1024 * 1024,
            max_files: 5,
            trim_percent: 25,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetentionConfig {
    pub max_age: Duration,
    pub min_entries: usize,
    pub cleanup_interval: Duration,
}

/// A function invoked at every ingress to produce an auto-context map. A `None`
/// return means "skip"; a panic is caught and treated the same as `None`.
pub type ContextProvider = Box<dyn Fn() -> Option<Vec<(String, ContextValue)>> + Send + Sync>;

pub struct Config {
    pub min_level: Level,
    pub enabled: bool,
    pub buffer_size: usize,
    pub flush_interval: Duration,
    pub directory: PathBuf,
    pub format: FormatKind,
    pub rotation: RotationConfig,
    /// 32-byte AES-256-GCM key. Absence means lines are stored in plaintext.
    pub encryption_key: Option<Vec<u8>>,
    pub redaction_patterns: Vec<RedactionPattern>,
    pub context_providers: Vec<ContextProvider>,
    pub hooks: Hooks,
    pub retention: Option<RetentionConfig>,
    pub sinks: Vec<Box<dyn Sink>>,
    pub sensitive_mode: bool,
}

impl Config {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Config {
            min_level: Level::Verbose,
            enabled: true,
            buffer_size: 1000,
            flush_interval: Duration::from_secs(5),
            directory: directory.into(),
            format: FormatKind::Json,
            rotation: RotationConfig::default(),
            encryption_key: None,
            redaction_patterns: Vec::new(),
            context_providers: Vec::new(),
            hooks: Hooks::none(),
            retention: None,
            sinks: Vec::new(),
            sensitive_mode: false,
        }
    }

    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn with_format(mut self, format: FormatKind) -> Self {
        self.format = format;
        self
    }

    pub fn with_rotation(mut self, rotation: RotationConfig) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_encryption_key(mut self, key: Vec<u8>) -> Self {
        self.encryption_key = Some(key);
        self
    }

    pub fn with_redaction_patterns(mut self, patterns: Vec<RedactionPattern>) -> Self {
        self.redaction_patterns = patterns;
        self
    }

    pub fn with_retention(mut self, retention: RetentionConfig) -> Self {
        self.retention = Some(retention);
        self
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn add_sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }
}
