//! hooks.rs
//! Engine-lifecycle callbacks with a per-thread recursion guard.
//!
//! The guard is thread-local, not global: a hook running on the worker thread
//! should not be throttled by re-entrancy happening on some unrelated caller
//! thread, and vice versa.

use std::cell::Cell;

use crate::record::Record;

const MAX_HOOK_DEPTH: u8 = 5;

thread_local! {
    static HOOK_DEPTH: Cell<u8> = Cell::new(0);
}

struct DepthGuard;

impl DepthGuard {
    fn enter() -> Option<DepthGuard> {
        HOOK_DEPTH.with(|depth| {
            if depth.get() >= MAX_HOOK_DEPTH {
                None
            } else {
                depth.set(depth.get() + 1);
                Some(DepthGuard)
            }
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        HOOK_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

type OnLog = Box<dyn Fn(&Record) + Send + Sync>;
type OnFlush = Box<dyn Fn(usize) + Send + Sync>;
type OnRotate = Box<dyn Fn() + Send + Sync>;
type OnError = Box<dyn Fn(&str, &str) + Send + Sync>;

#[derive(Default)]
pub struct Hooks {
    pub on_log: Option<OnLog>,
    pub on_flush: Option<OnFlush>,
    pub on_rotate: Option<OnRotate>,
    pub on_error: Option<OnError>,
}

impl Hooks {
    pub fn none() -> Self {
        Hooks::default()
    }

    /// Invokes `onLog` under the recursion guard; over-limit invocations are
    /// silently skipped, matching the enqueue-path contract that nothing here may
    /// ever propagate an error to the caller.
    pub fn fire_on_log(&self, record: &Record) {
        if let Some(cb) = &self.on_log {
            if let Some(_guard) = DepthGuard::enter() {
                let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cb(record)));
            }
        }
    }

    pub fn fire_on_flush(&self, count: usize) {
        if let Some(cb) = &self.on_flush {
            if let Some(_guard) = DepthGuard::enter() {
                let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cb(count)));
            }
        }
    }

    pub fn fire_on_rotate(&self) {
        if let Some(cb) = &self.on_rotate {
            if let Some(_guard) = DepthGuard::enter() {
                let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cb()));
            }
        }
    }

    pub fn fire_on_error(&self, err: &str, trace: &str) {
        if let Some(cb) = &self.on_error {
            if let Some(_guard) = DepthGuard::enter() {
                let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cb(err, trace)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn on_log_fires_once_per_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let hooks = Hooks {
            on_log: Some(Box::new(move |_r| {
                calls2.fetch_add(1, Ordering::SeqCst);
            })),
            ..Hooks::none()
        };
        let record = Record::new(Utc::now(), Level::Info, "c", "m", None, "s".into(), 1);
        hooks.fire_on_log(&record);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn depth_guard_admits_five_and_rejects_the_sixth() {
        let mut guards = Vec::new();
        for _ in 0..MAX_HOOK_DEPTH {
            guards.push(DepthGuard::enter().expect("within bound"));
        }
        assert!(DepthGuard::enter().is_none());
        drop(guards);
        assert!(DepthGuard::enter().is_some());
    }

    #[test]
    fn panicking_hook_does_not_propagate() {
        let hooks = Hooks {
            on_log: Some(Box::new(|_r| panic!("boom"))),
            ..Hooks::none()
        };
        let record = Record::new(Utc::now(), Level::Info, "c", "m", None, "s".into(), 1);
        hooks.fire_on_log(&record);
    }
}
