//! GitHub REST implementation of the catalog API

use crate::catalog::api::{CatalogApi, CatalogError};
use crate::catalog::source::CatalogEntry;
use crate::config::{EnrichSettings, UserAgentConfig};
use crate::state::ItemMetadata;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Fields read from `GET /repos/{owner}/{repo}`
#[derive(Debug, Deserialize)]
struct RepoResponse {
    #[serde(default)]
    stargazers_count: u64,
    description: Option<String>,
    license: Option<LicenseResponse>,
    #[serde(default)]
    topics: Vec<String>,
    language: Option<String>,
    default_branch: Option<String>,
    #[serde(default)]
    archived: bool,
    pushed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct LicenseResponse {
    spdx_id: Option<String>,
    name: Option<String>,
}

impl From<RepoResponse> for ItemMetadata {
    fn from(repo: RepoResponse) -> Self {
        let license = repo.license.and_then(|l| {
            l.spdx_id
                .filter(|id| !id.is_empty() && id != "NOASSERTION")
                .or(l.name)
        });

        ItemMetadata {
            description: repo.description,
            license,
            topics: repo.topics,
            language: repo.language,
            default_branch: repo.default_branch,
            archived: repo.archived,
            pushed_at: repo.pushed_at,
        }
    }
}

/// GitHub catalog client
///
/// | Response | Result |
/// |----------|--------|
/// | 2xx | parsed fields |
/// | 404 | `NotFound` |
/// | 429 | `RateLimited` |
/// | 403 with `x-ratelimit-remaining: 0` | `RateLimited` |
/// | anything else | `Failed` |
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(client: Client, base_url: Url, token: Option<String>) -> Self {
        Self {
            client,
            base_url,
            token,
        }
    }

    /// Builds a client for an enrich job
    pub fn from_settings(
        user_agent: &UserAgentConfig,
        settings: &EnrichSettings,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent.header_value())
            .timeout(settings.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .build()?;

        Ok(Self::new(
            client,
            settings.api_base_url.clone(),
            settings.token.clone(),
        ))
    }

    fn repo_endpoint(&self, entry: &CatalogEntry) -> Result<Url, CatalogError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CatalogError::Failed(format!("unusable API base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(["repos", entry.owner.as_str(), entry.repo.as_str()]);
        Ok(url)
    }

    async fn get_repo(&self, entry: &CatalogEntry) -> Result<RepoResponse, CatalogError> {
        let url = self.repo_endpoint(entry)?;

        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| CatalogError::Failed(e.to_string()))?;

        let status = response.status();
        if let Some(error) = classify_status(status, response.headers(), &entry.id) {
            return Err(error);
        }

        response
            .json::<RepoResponse>()
            .await
            .map_err(|e| CatalogError::Failed(format!("invalid response for {}: {}", entry.id, e)))
    }
}

/// Maps a non-success response to its catalog error
fn classify_status(status: StatusCode, headers: &HeaderMap, id: &str) -> Option<CatalogError> {
    if status.is_success() {
        return None;
    }

    let remaining = header_str(headers, "x-ratelimit-remaining");
    let quota_spent = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && remaining == Some("0"));

    if quota_spent {
        let reset_at = header_str(headers, "x-ratelimit-reset")
            .and_then(|v| v.parse::<i64>().ok())
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
        return Some(CatalogError::RateLimited { reset_at });
    }

    if status == StatusCode::NOT_FOUND {
        return Some(CatalogError::NotFound(id.to_string()));
    }

    Some(CatalogError::Failed(format!("HTTP {} for {}", status.as_u16(), id)))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

#[async_trait]
impl CatalogApi for GitHubClient {
    async fn fetch_ranking_signal(&self, entry: &CatalogEntry) -> Result<u64, CatalogError> {
        Ok(self.get_repo(entry).await?.stargazers_count)
    }

    async fn fetch_detail(&self, entry: &CatalogEntry) -> Result<ItemMetadata, CatalogError> {
        Ok(self.get_repo(entry).await?.into())
    }
}
