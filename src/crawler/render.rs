//! Render capability
//!
//! The crawl driver only needs "URL in, final HTML out". A JavaScript-capable
//! browser can be plugged in through [`Renderer`]; [`HttpRenderer`] covers
//! static documentation sites with a plain HTTP client.

use crate::config::UserAgentConfig;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors from rendering a page; all are treated as a failed unit
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Expected HTML from {url}, got '{content_type}'")]
    ContentMismatch { url: String, content_type: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Render failed: {0}")]
    Other(String),
}

/// A rendered page
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// URL after redirects; relative links resolve against it
    pub final_url: Url,
    pub html: String,
}

/// Turns a URL into its final HTML
///
/// Implementations may be slow. The driver races every call against its
/// cancellation token, so a render future must be safe to drop at any await.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &Url) -> Result<RenderedPage, RenderError>;
}

/// Builds an HTTP client with the crawler's user agent
///
/// # Example
///
/// ```no_run
/// use docsweep::config::UserAgentConfig;
/// use docsweep::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "DocSweep".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Renders pages with a plain GET request
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_user_agent(
        config: &UserAgentConfig,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config, timeout)?))
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, url: &Url) -> Result<RenderedPage, RenderError> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            return Err(RenderError::Status {
                url: final_url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !content_type.contains("text/html") && !content_type.contains("application/xhtml") {
            return Err(RenderError::ContentMismatch {
                url: final_url.to_string(),
                content_type,
            });
        }

        let html = response.text().await.map_err(classify_reqwest_error)?;

        Ok(RenderedPage { final_url, html })
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> RenderError {
    if e.is_timeout() {
        RenderError::Timeout(e.to_string())
    } else if e.is_connect() || e.is_request() || e.is_body() {
        RenderError::Network(e.to_string())
    } else {
        RenderError::Other(e.to_string())
    }
}
