use crate::config::settings::{CrawlSettings, EnrichSettings};
use crate::config::types::{Config, UserAgentConfig};
use crate::ConfigError;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Validates the entire configuration
///
/// Every job is also resolved into its settings once here, so a config that
/// loads is a config whose jobs can all be constructed.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_user_agent_config(&config.user_agent)?;
    validate_job_set(config)?;

    for job in &config.crawl {
        CrawlSettings::from_config(job, &config.sessions)?;
    }
    for job in &config.enrich {
        EnrichSettings::from_config(job)?;
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Checks the relations between jobs
///
/// Names must be unique across crawl and enrich jobs, and no two jobs may
/// write into the same output directory: there is no cross-process locking
/// on session and checkpoint files.
fn validate_job_set(config: &Config) -> Result<(), ConfigError> {
    if config.crawl.is_empty() && config.enrich.is_empty() {
        return Err(ConfigError::Validation(
            "configuration defines no [[crawl]] or [[enrich]] jobs".to_string(),
        ));
    }

    let mut names = HashSet::new();
    let mut dirs = HashSet::new();

    let jobs = config
        .crawl
        .iter()
        .map(|j| (&j.name, &j.output_dir))
        .chain(config.enrich.iter().map(|j| (&j.name, &j.output_dir)));

    for (name, output_dir) in jobs {
        if name.trim().is_empty() {
            return Err(ConfigError::Validation("job name cannot be empty".to_string()));
        }

        if !names.insert(name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate job name '{}'",
                name
            )));
        }

        if output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!(
                "output-dir of job '{}' cannot be empty",
                name
            )));
        }

        if !dirs.insert(lexical_path(output_dir)) {
            return Err(ConfigError::Validation(format!(
                "output-dir '{}' of job '{}' is shared with another job",
                output_dir.display(),
                name
            )));
        }
    }

    Ok(())
}

/// Lexically cleans a path (`./out/../out/a/` and `out/a` compare equal)
fn lexical_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    cleaned.push("..");
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
