//! Configuration module for the crawler
//!
//! This module handles loading, parsing, and validating the TOML settings file,
//! and writing a default one when none exists.
//!
//! # Example
//!
//! ```no_run
//! use profesia_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("settings.toml")).unwrap();
//! println!("Freshness marker: {}", config.site.freshness_marker);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, SelectorConfig, SiteConfig, StoreConfig, TableConfig, TimingConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, load_or_default_config,
    parse_config, write_default_config, ConfigSource, DEFAULT_CONFIG,
};

pub(crate) use validation::parse_selector;
