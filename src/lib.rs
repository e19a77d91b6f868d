//! nightlog_core
//! The core logging engine of a local, on-device structured logger: ingestion
//! buffer, flush scheduler, worker pipeline (redact → format → encrypt → append),
//! and file rotation/retention. See `engine` for the process-wide resource and
//! `config::Config` for everything that can be tuned at `init`.
//!
//! Storage-location discovery, export/archive packaging, and the host UI are
//! out of scope here and live one layer up; this crate exposes the interfaces
//! they need (`engine::LogEngine::export_handle`, hooks, sinks) without
//! implementing them.

pub mod buffer;
pub mod config;
pub mod context;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod export;
pub mod format;
pub mod hooks;
pub mod level;
pub mod record;
pub mod redact;
pub mod rotation;
pub mod sinks;
pub mod stats;

pub use config::{Config, ContextProvider, RetentionConfig, RotationConfig, RotationStrategy};
pub use context::ContextValue;
pub use engine::LogEngine;
pub use error::{EngineError, EngineResult};
pub use format::FormatKind;
pub use hooks::Hooks;
pub use level::Level;
pub use record::Record;
pub use sinks::Sink;

use std::sync::Arc;

fn require_engine() -> EngineResult<Arc<LogEngine>> {
    engine::current().ok_or_else(|| EngineError::Validation("engine is not initialized".into()))
}

/// Initializes the process-wide engine. Idempotent while one is already live.
pub fn init(config: Config) -> EngineResult<Arc<LogEngine>> {
    engine::init(config)
}

/// Runs a final flush, cancels timers, and clears the global engine.
pub fn dispose() -> EngineResult<()> {
    engine::dispose()
}

/// `log(level, message, context?)`. A no-op if the engine has not been initialized
/// — no error ever reaches the ingress path.
pub fn log(level: Level, message: &str, context: Option<ContextValue>) {
    if let Some(engine) = engine::current() {
        engine.log(level, message, context);
    }
}

/// `logIn(level, category, message, context?)` — the category-qualified entry point.
pub fn log_in(level: Level, category: &str, message: &str, context: Option<ContextValue>) {
    if let Some(engine) = engine::current() {
        engine.log_in(level, category, message, context);
    }
}

pub fn flush() -> EngineResult<usize> {
    require_engine()?.flush()
}

pub fn export() -> EngineResult<Vec<String>> {
    require_engine()?.export()
}

pub fn clear() -> EngineResult<()> {
    require_engine()?.clear()
}

pub fn get_stats() -> EngineResult<stats::StatsSnapshot> {
    require_engine()?.get_stats()
}
