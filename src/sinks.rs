//! sinks.rs
//! Additional synchronous consumers of raw records, distinct from file persistence.

use crate::record::Record;

/// A sink exposes exactly one method, called synchronously during enqueue after
/// level gating and before hook fan-out. A sink must not be able to affect other
/// sinks or the caller: `call` below catches panics so a bad sink degrades to a
/// no-op instead of taking the ingress path down with it.
pub trait Sink: Send + Sync {
    fn write(&self, record: &Record);
}

pub(crate) fn call_sink(sink: &dyn Sink, record: &Record) {
    let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sink.write(record)));
}
