//! Persisted batch-fetch checkpoint model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Marker carried by items that could not be enriched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemError {
    /// The remote entity no longer exists
    NotFound,
    /// Any other fetch failure
    FetchFailed,
}

impl ItemError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::FetchFailed => "fetch_failed",
        }
    }
}

/// Descriptive fields returned by a detail fetch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMetadata {
    pub description: Option<String>,
    pub license: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub language: Option<String>,
    pub default_branch: Option<String>,
    #[serde(default)]
    pub archived: bool,
    pub pushed_at: Option<DateTime<Utc>>,
}

/// One enriched catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    /// Identity key (`owner/repo`)
    pub id: String,
    pub url: String,
    /// Ranking signal from the ranking pass (stars)
    pub signal: Option<u64>,
    #[serde(flatten)]
    pub metadata: ItemMetadata,
    pub error: Option<ItemError>,
}

impl ItemRecord {
    /// A fully enriched item
    pub fn enriched(
        id: impl Into<String>,
        url: impl Into<String>,
        signal: Option<u64>,
        metadata: ItemMetadata,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            signal,
            metadata,
            error: None,
        }
    }

    /// An item kept for accounting with safe defaults and an error marker
    pub fn failed(
        id: impl Into<String>,
        url: impl Into<String>,
        signal: Option<u64>,
        error: ItemError,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            signal,
            metadata: ItemMetadata::default(),
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// True when the ranking signal is present and non-zero
    pub fn has_usable_signal(&self) -> bool {
        self.signal.map(|s| s > 0).unwrap_or(false)
    }
}

/// Durable progress of one batch fetch job
///
/// `processed_count` always equals `accumulated_results.len()`; a resumed run
/// re-enters the ranked entry list at that index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchCheckpoint {
    pub processed_count: usize,
    pub accumulated_results: Vec<ItemRecord>,
    /// Ranking signals by identity; `None` marks an entry whose ranking failed
    #[serde(default)]
    pub rankings: BTreeMap<String, Option<u64>>,
    /// Whether the ranking pass finished for every entry
    #[serde(default)]
    pub ranking_complete: bool,
    pub timestamp: DateTime<Utc>,
}

impl FetchCheckpoint {
    pub fn new() -> Self {
        Self {
            processed_count: 0,
            accumulated_results: Vec::new(),
            rankings: BTreeMap::new(),
            ranking_complete: false,
            timestamp: Utc::now(),
        }
    }

    /// Appends a classified item and advances the processed count
    pub fn push(&mut self, item: ItemRecord) {
        self.accumulated_results.push(item);
        self.processed_count = self.accumulated_results.len();
    }

    pub fn touch(&mut self) {
        self.timestamp = Utc::now();
    }
}

impl Default for FetchCheckpoint {
    fn default() -> Self {
        Self::new()
    }
}
