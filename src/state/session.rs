//! Persisted crawl session model
//!
//! A [`CrawlSession`] is the durable half of the frontier: the visited map,
//! the ordered work queue, and the bounds the crawl was started with. It is
//! serialized as JSON into the job's output directory after every processed
//! unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::PathBuf;

/// One crawled page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    pub url: String,
    /// Document `<title>`, when the page has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Hex SHA-256 of the normalized page text
    pub content_hash: String,
    pub local_path: PathBuf,
    pub depth: u32,
    pub last_crawled_at: DateTime<Utc>,
}

/// A unit waiting in the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedUnit {
    pub url: String,
    pub depth: u32,
}

/// A unit that was consumed without producing a page record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedUnit {
    pub depth: u32,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

/// Durable state of one crawl job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlSession {
    pub start_url: String,
    pub allowed_prefixes: BTreeSet<String>,
    pub max_pages: usize,
    pub max_depth: u32,
    pub output_directory: PathBuf,
    pub visited: BTreeMap<String, PageRecord>,
    pub queue: VecDeque<QueuedUnit>,
    /// Units consumed this run that failed; never re-enqueued within the run
    #[serde(default)]
    pub failed: BTreeMap<String, FailedUnit>,
    /// Records from the previous completed run, used for change detection
    #[serde(default)]
    pub prior: BTreeMap<String, PageRecord>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CrawlSession {
    /// Creates an empty, active session
    pub fn new(
        start_url: impl Into<String>,
        allowed_prefixes: BTreeSet<String>,
        max_pages: usize,
        max_depth: u32,
        output_directory: impl Into<PathBuf>,
    ) -> Self {
        let now = Utc::now();
        Self {
            start_url: start_url.into(),
            allowed_prefixes,
            max_pages,
            max_depth,
            output_directory: output_directory.into(),
            visited: BTreeMap::new(),
            queue: VecDeque::new(),
            failed: BTreeMap::new(),
            prior: BTreeMap::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Starts a new run over a finished session
    ///
    /// The visited records of the finished run become the prior records of the
    /// new one; bounds are replaced by the current job's settings.
    pub fn restart(
        previous: CrawlSession,
        allowed_prefixes: BTreeSet<String>,
        max_pages: usize,
        max_depth: u32,
    ) -> Self {
        let mut prior = previous.prior;
        prior.extend(previous.visited);

        let mut session = Self::new(
            previous.start_url,
            allowed_prefixes,
            max_pages,
            max_depth,
            previous.output_directory,
        );
        session.prior = prior;
        session
    }

    /// Returns the most recent record for `url`, from this run or the prior one
    pub fn prior_record(&self, url: &str) -> Option<&PageRecord> {
        self.visited.get(url).or_else(|| self.prior.get(url))
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// True once the page budget is used up
    pub fn budget_exhausted(&self) -> bool {
        self.visited.len() >= self.max_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str, hash: &str) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            title: None,
            content_hash: hash.to_string(),
            local_path: PathBuf::from("out/page.md"),
            depth: 1,
            last_crawled_at: Utc::now(),
        }
    }

    fn prefixes() -> BTreeSet<String> {
        ["https://example.test/docs/".to_string()].into_iter().collect()
    }

    #[test]
    fn test_new_session_is_active_and_empty() {
        let session = CrawlSession::new("https://example.test/docs", prefixes(), 5, 2, "out");
        assert!(session.is_active);
        assert!(session.visited.is_empty());
        assert!(session.queue.is_empty());
        assert!(!session.budget_exhausted());
    }

    #[test]
    fn test_restart_moves_visited_into_prior() {
        let mut session = CrawlSession::new("https://example.test/docs", prefixes(), 5, 2, "out");
        session
            .visited
            .insert("https://example.test/docs/a".into(), record("https://example.test/docs/a", "h1"));
        session.is_active = false;

        let restarted = CrawlSession::restart(session, prefixes(), 10, 3);

        assert!(restarted.is_active);
        assert!(restarted.visited.is_empty());
        assert_eq!(restarted.max_pages, 10);
        assert_eq!(
            restarted
                .prior_record("https://example.test/docs/a")
                .map(|r| r.content_hash.as_str()),
            Some("h1")
        );
    }

    #[test]
    fn test_json_field_names() {
        let session = CrawlSession::new("https://example.test/docs", prefixes(), 5, 2, "out");
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("startUrl").is_some());
        assert!(json.get("allowedPrefixes").is_some());
        assert!(json.get("isActive").is_some());
        assert!(json.get("maxPages").is_some());
    }

    #[test]
    fn test_budget_exhausted() {
        let mut session = CrawlSession::new("https://example.test/docs", prefixes(), 1, 2, "out");
        session
            .visited
            .insert("https://example.test/docs".into(), record("https://example.test/docs", "h"));
        assert!(session.budget_exhausted());
    }
}
