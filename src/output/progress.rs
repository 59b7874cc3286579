//! Progress notification contract
//!
//! A [`ProgressSink`] is handed to each traversal component at construction.
//! It is called synchronously after every processed unit, so implementations
//! must return quickly (or buffer) and must never be able to stop a job.

use std::panic::{catch_unwind, AssertUnwindSafe};

/// Receives progress notifications from a traversal job
pub trait ProgressSink: Send + Sync {
    /// Called after each processed unit
    ///
    /// `percentage` is cumulative in `0.0..=100.0`; `current` identifies the
    /// unit that was just processed (a URL or a catalog identity).
    fn on_progress(&self, percentage: f64, current: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(f64, &str) + Send + Sync,
{
    fn on_progress(&self, percentage: f64, current: &str) {
        self(percentage, current)
    }
}

/// Progress sink that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    #[inline(always)]
    fn on_progress(&self, _percentage: f64, _current: &str) {}
}

/// Progress sink that emits a tracing event per unit
#[derive(Debug, Clone)]
pub struct TracingProgress {
    job: String,
}

impl TracingProgress {
    pub fn new(job: impl Into<String>) -> Self {
        Self { job: job.into() }
    }
}

impl ProgressSink for TracingProgress {
    fn on_progress(&self, percentage: f64, current: &str) {
        tracing::info!(job = %self.job, "[{:5.1}%] {}", percentage, current);
    }
}

/// Invokes a sink, swallowing any panic it raises
///
/// Progress reporting is fire-and-forget; a misbehaving sink is logged and
/// otherwise ignored.
pub fn notify(sink: &dyn ProgressSink, percentage: f64, current: &str) {
    let result = catch_unwind(AssertUnwindSafe(|| sink.on_progress(percentage, current)));
    if result.is_err() {
        tracing::warn!("Progress sink panicked while reporting {}", current);
    }
}

/// Computes a cumulative percentage, clamped to `0.0..=100.0`
pub fn percentage(done: usize, expected: usize) -> f64 {
    if expected == 0 {
        return 100.0;
    }
    ((done as f64 / expected as f64) * 100.0).clamp(0.0, 100.0)
}
