//! Remote catalog API contract

use crate::catalog::source::CatalogEntry;
use crate::state::ItemMetadata;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from the catalog API and the entry source
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The caller's quota is spent; retrying before `reset_at` will fail again
    #[error("Rate limited by the catalog API{}", reset_suffix(.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    /// The remote entity no longer exists
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Catalog request failed: {0}")]
    Failed(String),

    #[error("Cannot read catalog source {path:?}: {message}")]
    Source { path: PathBuf, message: String },
}

fn reset_suffix(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(at) => format!(" until {}", at.to_rfc3339()),
        None => String::new(),
    }
}

/// Remote source of ranking signals and detail fields
///
/// Both calls must report quota exhaustion as
/// [`CatalogError::RateLimited`], distinct from any other failure.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Cheap call returning only the ranking signal (e.g. stars)
    async fn fetch_ranking_signal(&self, entry: &CatalogEntry) -> Result<u64, CatalogError>;

    /// Detail fields for one entry
    async fn fetch_detail(&self, entry: &CatalogEntry) -> Result<ItemMetadata, CatalogError>;
}
