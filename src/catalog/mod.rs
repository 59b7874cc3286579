//! Catalog enrichment
//!
//! Enriches a list of package repositories with metadata from a remote API
//! that enforces a request quota:
//! - The entry source (a JSON list of repository URLs)
//! - The API contract and its GitHub implementation
//! - The two-phase, checkpointed batch fetcher

mod api;
mod fetcher;
mod github;
mod source;

pub use api::{CatalogApi, CatalogError};
pub use fetcher::{finalize, BatchFetcher, FetchOutcome, FetchReport, ResultsFile};
pub use github::GitHubClient;
pub use source::{load_entries, parse_entries, CatalogEntry};
