//! Profesia crawler: an incremental job-listing indexer
//!
//! This crate searches a paginated job-listing site for a keyword, extracts
//! one record per listing row and hands the records to a persistence sink.
//! With a deduplicating sink the crawl stops as soon as it reaches listings it
//! indexed on an earlier run.

pub mod config;
pub mod crawler;
pub mod output;
pub mod record;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The site did not look the way the crawler expects (title, layout)
    #[error("Unexpected page: {0}")]
    Environment(String),

    #[error("Page driver error: {0}")]
    Driver(#[from] crawler::DriverError),

    #[error("Sink error: {0}")]
    Sink(#[from] storage::SinkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector '{selector}' for {field}")]
    InvalidSelector { field: &'static str, selector: String },
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use record::JobListingRecord;
pub use state::{CrawlState, HaltReason, RowOutcome};
pub use storage::{ClaimSet, Sink};
