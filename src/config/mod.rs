//! Configuration module for docsweep
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and resolving each configured job into its settings.
//!
//! # Example
//!
//! ```no_run
//! use docsweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("docsweep.toml")).unwrap();
//! println!("{} jobs configured", config.job_count());
//! ```

mod parser;
mod settings;
mod types;
mod validation;

pub use types::{
    Config, CrawlJobConfig, EnrichJobConfig, ResumeMode, SessionsConfig, UserAgentConfig,
};

pub use settings::{CrawlSettings, EnrichSettings, Pacing};

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
