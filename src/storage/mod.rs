//! Storage module for persisting traversal state
//!
//! This module handles all durable state of the crawler, including:
//! - Atomic JSON writes (temp file + rename)
//! - Fail-closed loading of sessions and checkpoints
//! - Discovery of resumable sessions in known locations
//!
//! Each job owns its output directory. Two processes pointed at the same
//! output directory are not supported; nothing here takes a file lock.

mod discovery;
mod json;
mod traits;

pub use discovery::discover_session;
pub use json::{load_json, save_json, write_atomic};
pub use traits::{StorageError, StorageResult};

use crate::state::{CrawlSession, FetchCheckpoint};
use std::path::{Path, PathBuf};

/// File name of the crawl session inside a job's output directory
pub const SESSION_FILE: &str = ".docsweep-session.json";

/// File name of the batch fetch checkpoint inside a job's output directory
pub const CHECKPOINT_FILE: &str = ".docsweep-checkpoint.json";

/// File name of the consolidated batch results
pub const RESULTS_FILE: &str = "results.json";

pub fn session_path(output_dir: &Path) -> PathBuf {
    output_dir.join(SESSION_FILE)
}

pub fn checkpoint_path(output_dir: &Path) -> PathBuf {
    output_dir.join(CHECKPOINT_FILE)
}

pub fn results_path(output_dir: &Path) -> PathBuf {
    output_dir.join(RESULTS_FILE)
}

/// Loads the session stored in `output_dir`, if any
pub async fn load_session(output_dir: &Path) -> StorageResult<Option<CrawlSession>> {
    load_json(&session_path(output_dir)).await
}

/// Persists a session into its own output directory
pub async fn save_session(session: &CrawlSession) -> StorageResult<()> {
    save_json(&session_path(&session.output_directory), session).await
}

/// Loads the checkpoint stored in `output_dir`, if any
pub async fn load_checkpoint(output_dir: &Path) -> StorageResult<Option<FetchCheckpoint>> {
    load_json(&checkpoint_path(output_dir)).await
}

/// Persists a checkpoint into `output_dir`
pub async fn save_checkpoint(output_dir: &Path, checkpoint: &FetchCheckpoint) -> StorageResult<()> {
    save_json(&checkpoint_path(output_dir), checkpoint).await
}
