//! Traversal statistics
//!
//! Counters are monotonic for the lifetime of a [`Statistics`] value; nothing
//! in this module decrements them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Classification of one processed unit, as seen by the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Content saved for a unit with no prior record (or a successful enrichment)
    New,
    /// Content saved over a prior record whose hash differed
    Updated,
    /// Content unchanged since the prior record, nothing written
    Skipped,
    /// Unit failed or was classified as an error item
    Error,
}

/// Counters and timing for one traversal job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub new: u64,
    pub updated: u64,
    pub skipped: u64,
    pub errors: u64,
    pub total: u64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Statistics {
    /// Creates statistics with the start time set to now
    pub fn started() -> Self {
        Self {
            start_time: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Records one processed unit
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::New => self.new += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Error => self.errors += 1,
        }
        self.total += 1;
    }

    /// Marks the end of the job
    pub fn finish(&mut self) {
        self.end_time = Some(Utc::now());
    }

    /// Elapsed time between start and end, when both are set
    pub fn duration(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// Number of units that produced written output
    pub fn saved(&self) -> u64 {
        self.new + self.updated
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(name: &str, stats: &Statistics) {
    println!("=== {} ===", name);
    println!("  New:      {}", stats.new);
    println!("  Updated:  {}", stats.updated);
    println!("  Skipped:  {}", stats.skipped);
    println!("  Errors:   {}", stats.errors);
    println!("  Total:    {}", stats.total);

    if let Some(duration) = stats.duration() {
        let secs = duration.num_milliseconds() as f64 / 1000.0;
        let rate = if secs > 0.0 {
            stats.total as f64 / secs
        } else {
            0.0
        };
        println!("  Duration: {:.1}s ({:.2} units/sec)", secs, rate);
    }
    println!();
}
