use serde::Deserialize;

/// Main configuration structure for the crawler
///
/// Every section falls back to its defaults, so an empty file is valid.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub selectors: SelectorConfig,
    pub timing: TimingConfig,
    pub store: StoreConfig,
    pub table: TableConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Landing page URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Title the landing page must carry
    #[serde(rename = "expected-title")]
    pub expected_title: String,

    /// Expected (upper-cased) prefix of the results heading
    #[serde(rename = "results-heading-prefix")]
    pub results_heading_prefix: String,

    /// First info token of a listing that was bumped by an update
    #[serde(rename = "freshness-marker")]
    pub freshness_marker: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.profesia.sk/".to_string(),
            expected_title:
                "PROFESIA.SK | Práca, zamestnanie, ponuka práce, brigády, voľné pracovné miesta"
                    .to_string(),
            results_heading_prefix: "PONUKY PRÁCE".to_string(),
            freshness_marker: "Aktualizované".to_string(),
        }
    }
}

/// CSS selectors used by the page driver and the record extractor
///
/// Row-level selectors (`title` through `info`) are evaluated inside a single
/// listing row.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    #[serde(rename = "listing-row")]
    pub listing_row: String,

    pub title: String,

    #[serde(rename = "offer-link")]
    pub offer_link: String,

    pub employer: String,

    #[serde(rename = "job-location")]
    pub job_location: String,

    pub salary: String,

    pub info: String,

    #[serde(rename = "next-page")]
    pub next_page: String,

    #[serde(rename = "search-input")]
    pub search_input: String,

    #[serde(rename = "search-submit")]
    pub search_submit: String,

    #[serde(rename = "cookie-decline")]
    pub cookie_decline: String,

    #[serde(rename = "results-heading")]
    pub results_heading: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            listing_row: "main.col-sm-6 li.list-row".to_string(),
            title: "h2".to_string(),
            offer_link: "h2 > a".to_string(),
            employer: "span.employer".to_string(),
            job_location: "span.job-location".to_string(),
            salary: "span.label-group > a[data-dimension7]".to_string(),
            info: "span.info".to_string(),
            next_page: "a.next".to_string(),
            search_input: "#offerCriteriaSuggesterInputId".to_string(),
            search_submit: "#offer-search-link".to_string(),
            cookie_decline: "#CybotCookiebotDialogBodyButtonDecline".to_string(),
            results_heading: ".col-xs-8".to_string(),
        }
    }
}

/// Waits and delays
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Upper bound on a single page load (seconds)
    #[serde(rename = "page-load-timeout-secs")]
    pub page_load_timeout_secs: u64,

    /// Pause before following the next-page control (milliseconds)
    #[serde(rename = "settle-delay-ms")]
    pub settle_delay_ms: u64,

    /// Pause between sessions in continuous mode (seconds)
    #[serde(rename = "continuous-delay-secs")]
    pub continuous_delay_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            page_load_timeout_secs: 15,
            settle_delay_ms: 500,
            continuous_delay_secs: 6,
        }
    }
}

/// Deduplicating store connection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: "./listings.db".to_string(),
        }
    }
}

/// Append-only table output
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Directory receiving one CSV file per run date and keyword
    #[serde(rename = "output-dir")]
    pub output_dir: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            output_dir: ".".to_string(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "profesia-crawler".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
