//! Validated, fully-resolved per-job settings
//!
//! Settings are built once when a job is constructed. Everything the traversal
//! loops read (parsed URLs, scope, durations, credentials) is resolved here so
//! the loops never re-validate.

use crate::config::types::{CrawlJobConfig, EnrichJobConfig, ResumeMode, SessionsConfig};
use crate::url::{normalize_url, ScopePrefixes};
use crate::ConfigError;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Settings of one crawl job
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub name: String,
    /// Normalized seed URL
    pub start_url: Url,
    pub scope: ScopePrefixes,
    pub max_pages: usize,
    pub max_depth: u32,
    pub output_dir: PathBuf,
    pub force: bool,
    pub resume: ResumeMode,
    pub request_timeout: Duration,
    pub session_search_roots: Vec<PathBuf>,
}

impl CrawlSettings {
    /// Settings with documented defaults and a scope derived from the seed
    ///
    /// Defaults: 1000 pages, depth 10, no force, `ResumeMode::Auto`, 30s
    /// request timeout, sessions searched in the current directory.
    pub fn new(
        name: impl Into<String>,
        start_url: &str,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let start_url = parse_seed(&name, start_url)?;
        let scope = ScopePrefixes::derive(&start_url);

        Ok(Self {
            name,
            start_url,
            scope,
            max_pages: 1000,
            max_depth: 10,
            output_dir: output_dir.into(),
            force: false,
            resume: ResumeMode::Auto,
            request_timeout: Duration::from_secs(30),
            session_search_roots: vec![PathBuf::from(".")],
        })
    }

    /// Builds and validates settings from a config entry
    pub fn from_config(
        config: &CrawlJobConfig,
        sessions: &SessionsConfig,
    ) -> Result<Self, ConfigError> {
        let mut settings = Self::new(&config.name, &config.start_url, &config.output_dir)?;

        if let Some(prefixes) = &config.allowed_prefixes {
            settings.scope = ScopePrefixes::new(prefixes).map_err(|e| {
                ConfigError::InvalidUrl(format!(
                    "Invalid allowed-prefixes for crawl '{}': {}",
                    config.name, e
                ))
            })?;
        }

        if !settings.scope.contains(&settings.start_url) {
            return Err(ConfigError::Validation(format!(
                "Start URL of crawl '{}' is outside its allowed prefixes",
                config.name
            )));
        }

        if config.max_pages < 1 {
            return Err(ConfigError::Validation(format!(
                "max-pages of crawl '{}' must be >= 1",
                config.name
            )));
        }

        if config.request_timeout_secs < 1 {
            return Err(ConfigError::Validation(format!(
                "request-timeout-secs of crawl '{}' must be >= 1",
                config.name
            )));
        }

        settings.max_pages = config.max_pages;
        settings.max_depth = config.max_depth;
        settings.force = config.force;
        settings.resume = config.resume;
        settings.request_timeout = Duration::from_secs(config.request_timeout_secs);
        settings.session_search_roots = sessions.search_roots.clone();

        Ok(settings)
    }
}

/// Request pacing of a batch fetch job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Sleep after every entry
    pub request_delay: Duration,
    /// Insert `long_pause` after every this many entries
    pub long_pause_every: usize,
    pub long_pause: Duration,
}

impl Pacing {
    /// No delays at all
    pub fn none() -> Self {
        Self {
            request_delay: Duration::ZERO,
            long_pause_every: usize::MAX,
            long_pause: Duration::ZERO,
        }
    }

    /// Delay owed after the `processed`-th request of a phase (1-based)
    pub fn delay_after(&self, processed: usize) -> Duration {
        if self.long_pause_every > 0 && processed > 0 && processed % self.long_pause_every == 0 {
            self.request_delay + self.long_pause
        } else {
            self.request_delay
        }
    }
}

/// Settings of one catalog enrichment job
#[derive(Debug, Clone)]
pub struct EnrichSettings {
    pub name: String,
    pub source: PathBuf,
    pub output_dir: PathBuf,
    pub max_entries: Option<usize>,
    pub pacing: Pacing,
    pub checkpoint_every: usize,
    pub api_base_url: Url,
    /// Optional; without it the remote rate budget is lower
    pub token: Option<String>,
    pub resume: ResumeMode,
    pub request_timeout: Duration,
}

impl EnrichSettings {
    /// Settings with documented defaults against the given API endpoint
    ///
    /// Defaults: 1200ms per entry, a 10s pause every 50 entries, a checkpoint
    /// every 100 entries, no token, `ResumeMode::Auto`.
    pub fn new(
        name: impl Into<String>,
        source: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        api_base_url: Url,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            output_dir: output_dir.into(),
            max_entries: None,
            pacing: Pacing {
                request_delay: Duration::from_millis(1200),
                long_pause_every: 50,
                long_pause: Duration::from_secs(10),
            },
            checkpoint_every: 100,
            api_base_url,
            token: None,
            resume: ResumeMode::Auto,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Builds and validates settings from a config entry
    ///
    /// The token is taken from the config, or else from the environment
    /// variable named by `token-env`.
    pub fn from_config(config: &EnrichJobConfig) -> Result<Self, ConfigError> {
        if config.checkpoint_every < 1 {
            return Err(ConfigError::Validation(format!(
                "checkpoint-every of enrich '{}' must be >= 1",
                config.name
            )));
        }

        if config.long_pause_every < 1 {
            return Err(ConfigError::Validation(format!(
                "long-pause-every of enrich '{}' must be >= 1",
                config.name
            )));
        }

        if config.max_entries == Some(0) {
            return Err(ConfigError::Validation(format!(
                "max-entries of enrich '{}' must be >= 1 when set",
                config.name
            )));
        }

        let api_base_url = Url::parse(&config.api_base_url).map_err(|e| {
            ConfigError::InvalidUrl(format!(
                "Invalid api-base-url for enrich '{}': {}",
                config.name, e
            ))
        })?;

        let token = config
            .token
            .clone()
            .or_else(|| std::env::var(&config.token_env).ok())
            .filter(|t| !t.trim().is_empty());

        Ok(Self {
            name: config.name.clone(),
            source: config.source.clone(),
            output_dir: config.output_dir.clone(),
            max_entries: config.max_entries,
            pacing: Pacing {
                request_delay: Duration::from_millis(config.request_delay_ms),
                long_pause_every: config.long_pause_every,
                long_pause: Duration::from_millis(config.long_pause_ms),
            },
            checkpoint_every: config.checkpoint_every,
            api_base_url,
            token,
            resume: config.resume,
            request_timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
        })
    }
}

fn parse_seed(job: &str, start_url: &str) -> Result<Url, ConfigError> {
    normalize_url(start_url).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "Invalid start-url '{}' for crawl '{}': {}",
            start_url, job, e
        ))
    })
}
