//! Progress observation port
//!
//! Events may be emitted from any worker thread; implementations are
//! responsible for their own synchronization. The engine reports
//! diagnostics exclusively through this port and `tracing` — it never
//! writes to stdout or stderr itself.

/// Observer for pipeline progress and diagnostics
pub trait Progress: Send + Sync {
    /// An operation over `total` items is starting
    fn start(&self, _total: u64) {}

    /// `n` more items finished
    fn inc(&self, _n: u64) {}

    /// Informational message
    fn info(&self, _msg: &str) {}

    /// Something tolerable went wrong (legacy fixups, demoted codec
    /// failures)
    fn warn(&self, _msg: &str) {}

    /// The operation completed
    fn finish(&self, _msg: &str) {}
}

/// Observer that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl Progress for NoopProgress {}
