use crate::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for docsweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub crawl: Vec<CrawlJobConfig>,
    #[serde(default)]
    pub enrich: Vec<EnrichJobConfig>,
}

impl Config {
    /// Applies command-line overrides to every job
    ///
    /// `force` only ever turns forcing on; `resume` replaces each job's mode.
    pub fn apply_overrides(&mut self, force: bool, resume: Option<ResumeMode>) {
        for job in &mut self.crawl {
            job.force |= force;
            if let Some(mode) = resume {
                job.resume = mode;
            }
        }
        if let Some(mode) = resume {
            for job in &mut self.enrich {
                job.resume = mode;
            }
        }
    }

    /// Keeps only the named jobs; an empty selection keeps everything
    pub fn retain_jobs(&mut self, names: &[String]) -> Result<(), ConfigError> {
        if names.is_empty() {
            return Ok(());
        }

        for name in names {
            let known = self.crawl.iter().any(|j| &j.name == name)
                || self.enrich.iter().any(|j| &j.name == name);
            if !known {
                return Err(ConfigError::UnknownJob(name.clone()));
            }
        }

        self.crawl.retain(|j| names.contains(&j.name));
        self.enrich.retain(|j| names.contains(&j.name));
        Ok(())
    }

    pub fn job_count(&self) -> usize {
        self.crawl.len() + self.enrich.len()
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Where to look for resumable sessions when a crawl job asks to resume
#[derive(Debug, Clone, Deserialize)]
pub struct SessionsConfig {
    #[serde(rename = "search-roots", default = "default_search_roots")]
    pub search_roots: Vec<PathBuf>,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            search_roots: default_search_roots(),
        }
    }
}

/// Whether a job continues from persisted state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumeMode {
    /// Resume when an active session (or checkpoint) exists, else start fresh
    #[default]
    Auto,
    /// Resume or fail; searches the session roots if the output directory has none
    Always,
    /// Ignore persisted progress and start over
    Never,
}

/// One crawl job
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlJobConfig {
    pub name: String,

    /// Seed URL
    pub start_url: String,

    /// Scope prefixes; derived from the start URL when absent
    #[serde(default)]
    pub allowed_prefixes: Option<Vec<String>>,

    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    pub output_dir: PathBuf,

    /// Rewrite pages even when their content hash is unchanged
    #[serde(default)]
    pub force: bool,

    #[serde(default)]
    pub resume: ResumeMode,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// One catalog enrichment job
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EnrichJobConfig {
    pub name: String,

    /// JSON file listing repository URLs
    pub source: PathBuf,

    pub output_dir: PathBuf,

    /// Process at most this many entries from the source
    #[serde(default)]
    pub max_entries: Option<usize>,

    /// Delay after every entry (milliseconds)
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Insert a long pause after this many entries
    #[serde(default = "default_long_pause_every")]
    pub long_pause_every: usize,

    /// Length of the long pause (milliseconds)
    #[serde(default = "default_long_pause_ms")]
    pub long_pause_ms: u64,

    /// Persist a checkpoint after this many detail fetches
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: usize,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// API token; read from `token_env` when absent
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default)]
    pub resume: ResumeMode,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_search_roots() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}

fn default_max_pages() -> usize {
    1000
}

fn default_max_depth() -> u32 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_request_delay_ms() -> u64 {
    1200
}

fn default_long_pause_every() -> usize {
    50
}

fn default_long_pause_ms() -> u64 {
    10_000
}

fn default_checkpoint_every() -> usize {
    100
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}
