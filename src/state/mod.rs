//! State module for tracking traversal progress
//!
//! # Components
//!
//! - `UnitState`: the per-page state machine inside the crawl driver
//! - `CrawlSession` / `PageRecord`: durable frontier state of a crawl job
//! - `FetchCheckpoint` / `ItemRecord`: durable progress of a batch fetch job

mod checkpoint;
mod session;
mod unit_state;

pub use checkpoint::{FetchCheckpoint, ItemError, ItemMetadata, ItemRecord};
pub use session::{CrawlSession, FailedUnit, PageRecord, QueuedUnit};
pub use unit_state::UnitState;
