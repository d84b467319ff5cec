use crate::config::types::{
    Config, SelectorConfig, SiteConfig, StoreConfig, TableConfig, TimingConfig, UserAgentConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_selectors(&config.selectors)?;
    validate_timing_config(&config.timing)?;
    validate_store_config(&config.store)?;
    validate_table_config(&config.table)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates the target site configuration
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.expected_title.trim().is_empty() {
        return Err(ConfigError::Validation(
            "expected_title cannot be empty".to_string(),
        ));
    }

    if config.results_heading_prefix.trim().is_empty() {
        return Err(ConfigError::Validation(
            "results_heading_prefix cannot be empty".to_string(),
        ));
    }

    // Compared against a single whitespace-separated token
    if config.freshness_marker.is_empty()
        || config.freshness_marker.chars().any(char::is_whitespace)
    {
        return Err(ConfigError::Validation(format!(
            "freshness_marker must be a single non-empty token, got '{}'",
            config.freshness_marker
        )));
    }

    Ok(())
}

/// Checks that every selector parses
fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    let selectors = [
        ("listing-row", &config.listing_row),
        ("title", &config.title),
        ("offer-link", &config.offer_link),
        ("employer", &config.employer),
        ("job-location", &config.job_location),
        ("salary", &config.salary),
        ("info", &config.info),
        ("next-page", &config.next_page),
        ("search-input", &config.search_input),
        ("search-submit", &config.search_submit),
        ("cookie-decline", &config.cookie_decline),
        ("results-heading", &config.results_heading),
    ];

    for (field, selector) in selectors {
        parse_selector(field, selector)?;
    }

    Ok(())
}

/// Parses a CSS selector, naming the config field on failure
pub(crate) fn parse_selector(field: &'static str, selector: &str) -> Result<Selector, ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::InvalidSelector {
            field,
            selector: selector.to_string(),
        });
    }

    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        field,
        selector: selector.to_string(),
    })
}

/// Validates timing configuration
fn validate_timing_config(config: &TimingConfig) -> Result<(), ConfigError> {
    if config.page_load_timeout_secs < 1 || config.page_load_timeout_secs > 120 {
        return Err(ConfigError::Validation(format!(
            "page_load_timeout_secs must be between 1 and 120, got {}",
            config.page_load_timeout_secs
        )));
    }

    if config.settle_delay_ms > 1000 {
        return Err(ConfigError::Validation(format!(
            "settle_delay_ms must be at most 1000ms, got {}ms",
            config.settle_delay_ms
        )));
    }

    Ok(())
}

/// Validates the deduplicating store configuration
fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates the append-only table configuration
fn validate_table_config(config: &TableConfig) -> Result<(), ConfigError> {
    if config.output_dir.is_empty() {
        return Err(ConfigError::Validation(
            "output_dir cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
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

    if config.crawler_version.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    Ok(())
}
