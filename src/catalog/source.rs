//! Catalog entry source
//!
//! The source is a JSON array of repository URLs, either as plain strings or
//! as objects carrying a `url` field (other fields are ignored):
//!
//! ```json
//! ["https://github.com/apple/swift-nio", {"url": "https://github.com/vapor/vapor"}]
//! ```

use crate::catalog::api::CatalogError;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// One catalog entry to enrich
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// `owner/repo`
    pub id: String,
    pub owner: String,
    pub repo: String,
    /// URL as given in the source
    pub url: String,
}

impl CatalogEntry {
    /// Parses a repository reference
    ///
    /// Accepts `https://github.com/owner/repo` (optionally with `.git`, a
    /// trailing slash, or deeper path segments) and bare `owner/repo`.
    ///
    /// # Examples
    ///
    /// ```
    /// use docsweep::catalog::CatalogEntry;
    ///
    /// let entry = CatalogEntry::parse("https://github.com/apple/swift-nio.git").unwrap();
    /// assert_eq!(entry.id, "apple/swift-nio");
    /// assert!(CatalogEntry::parse("https://example.test/").is_none());
    /// ```
    pub fn parse(reference: &str) -> Option<Self> {
        let trimmed = reference.trim();

        let path = if trimmed.contains("://") {
            let url = url::Url::parse(trimmed).ok()?;
            let host = url.host_str()?.to_ascii_lowercase();
            if host != "github.com" && host != "www.github.com" {
                return None;
            }
            url.path().to_string()
        } else if let Some(rest) = trimmed.strip_prefix("github.com/") {
            rest.to_string()
        } else {
            trimmed.to_string()
        };

        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let owner = segments.next()?;
        let repo = segments.next()?;
        let repo = repo.strip_suffix(".git").unwrap_or(repo);

        if !valid_name(owner) || !valid_name(repo) {
            return None;
        }

        Some(Self {
            id: format!("{}/{}", owner, repo),
            owner: owner.to_string(),
            repo: repo.to_string(),
            url: trimmed.to_string(),
        })
    }
}

fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SourceEntry {
    Url(String),
    Object { url: String },
}

/// Parses source JSON into entries
///
/// Unparseable references are skipped with a warning. Duplicates (compared
/// case-insensitively) keep their first position. `limit` truncates after
/// deduplication.
pub fn parse_entries(json: &str, limit: Option<usize>) -> Result<Vec<CatalogEntry>, serde_json::Error> {
    let raw: Vec<SourceEntry> = serde_json::from_str(json)?;

    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for item in raw {
        let reference = match item {
            SourceEntry::Url(url) | SourceEntry::Object { url } => url,
        };

        let Some(entry) = CatalogEntry::parse(&reference) else {
            tracing::warn!("Skipping unrecognized catalog entry: {}", reference);
            continue;
        };

        if seen.insert(entry.id.to_ascii_lowercase()) {
            entries.push(entry);
        }

        if limit.map(|l| entries.len() >= l).unwrap_or(false) {
            break;
        }
    }

    Ok(entries)
}

/// Reads and parses the source file at `path`
pub async fn load_entries(path: &Path, limit: Option<usize>) -> Result<Vec<CatalogEntry>, CatalogError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CatalogError::Source {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    parse_entries(&content, limit).map_err(|e| CatalogError::Source {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
