//! Output module for statistics and progress reporting
//!
//! This module handles:
//! - Monotonic per-job counters and timing
//! - The injected progress sink contract and its built-in sinks
//! - Printing end-of-run summaries

pub mod progress;
pub mod stats;

pub use progress::{notify, percentage, NoopProgress, ProgressSink, TracingProgress};
pub use stats::{print_statistics, Outcome, Statistics};
