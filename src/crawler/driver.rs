//! Page driver
//!
//! The page driver owns the "current page" of a browsing session and answers
//! the handful of questions the crawl needs: what is the title, where are the
//! listing rows, is there a next page. `HttpPageDriver` implements it over
//! plain HTTP for server-rendered result pages:
//! - pages are loaded with a bounded request timeout
//! - selectors are evaluated against the last loaded document
//! - the search form is submitted as a GET request
//! - pagination follows the next-page link, never back to a page already
//!   visited in the current search

use crate::config::{parse_selector, Config, SelectorConfig, UserAgentConfig};
use crate::ConfigError;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised by a page driver
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("No page loaded")]
    NoPageLoaded,

    #[error("Element not found: {0}")]
    ElementNotFound(String),
}

/// Result type for page driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Snapshot of one listing row, detached from the live page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// Outer HTML of the row element
    pub html: String,

    /// URL of the page the row came from, for resolving relative links
    pub base_url: Option<Url>,
}

impl RawRow {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }
}

/// Browser-like access to the listing site
#[async_trait(?Send)]
pub trait PageDriver {
    /// Loads `url` as the current page
    async fn navigate(&mut self, url: &str) -> DriverResult<()>;

    /// Title of the current page
    fn title(&self) -> Option<String>;

    /// Dismisses the cookie-consent banner; returns whether one was present
    async fn dismiss_cookie_banner(&mut self) -> DriverResult<bool>;

    /// Types `keyword` into the search box and submits it
    async fn submit_search(&mut self, keyword: &str) -> DriverResult<()>;

    /// Text of the results heading, absent when the search found nothing
    fn results_heading(&self) -> Option<String>;

    /// All listing rows on the current page, in page order
    fn listing_rows(&self) -> DriverResult<Vec<RawRow>>;

    /// Whether the current page offers a next-page control
    fn has_next_page(&self) -> bool;

    /// Activates the next-page control
    async fn go_to_next_page(&mut self) -> DriverResult<()>;

    /// Releases the session
    async fn close(&mut self) -> DriverResult<()>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `page_load_timeout` - Upper bound on a whole request
pub fn build_http_client(
    config: &UserAgentConfig,
    page_load_timeout: Duration,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version
    let user_agent = format!("{}/{}", config.crawler_name, config.crawler_version);

    Client::builder()
        .user_agent(user_agent)
        .timeout(page_load_timeout)
        .connect_timeout(page_load_timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Compiled page-level selectors
struct DriverSelectors {
    listing_row: Selector,
    next_page: Selector,
    search_input: Selector,
    search_submit: Selector,
    cookie_decline: Selector,
    results_heading: Selector,
    hidden_input: Selector,
}

impl DriverSelectors {
    fn from_config(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            listing_row: parse_selector("listing-row", &config.listing_row)?,
            next_page: parse_selector("next-page", &config.next_page)?,
            search_input: parse_selector("search-input", &config.search_input)?,
            search_submit: parse_selector("search-submit", &config.search_submit)?,
            cookie_decline: parse_selector("cookie-decline", &config.cookie_decline)?,
            results_heading: parse_selector("results-heading", &config.results_heading)?,
            hidden_input: parse_selector("hidden-input", "input[type=\"hidden\"]")?,
        })
    }
}

/// The current page, parsed once when it is loaded
struct LoadedPage {
    url: Url,
    document: Html,
}

/// Page driver over plain HTTP
pub struct HttpPageDriver {
    client: Client,
    selectors: DriverSelectors,
    current: Option<LoadedPage>,
    visited: HashSet<Url>,
}

impl HttpPageDriver {
    /// Creates a driver from the crawler configuration
    pub fn new(config: &Config) -> Result<Self, crate::CrawlerError> {
        let selectors = DriverSelectors::from_config(&config.selectors)?;
        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.timing.page_load_timeout_secs),
        )
        .map_err(DriverError::Client)?;

        Ok(Self {
            client,
            selectors,
            current: None,
            visited: HashSet::new(),
        })
    }

    /// URL of the current page, after redirects
    pub fn current_url(&self) -> Option<&Url> {
        self.current.as_ref().map(|page| &page.url)
    }

    fn loaded(&self) -> DriverResult<&LoadedPage> {
        self.current.as_ref().ok_or(DriverError::NoPageLoaded)
    }

    fn document(&self) -> Option<&Html> {
        self.current.as_ref().map(|page| &page.document)
    }

    fn set_page(&mut self, requested: Url, url: Url, body: &str) {
        self.visited.insert(requested);
        self.visited.insert(url.clone());
        self.current = Some(LoadedPage {
            url,
            document: Html::parse_document(body),
        });
    }

    async fn load(&mut self, url: Url) -> DriverResult<()> {
        tracing::debug!("Loading {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| DriverError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DriverError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(|source| DriverError::Http {
            url: final_url.to_string(),
            source,
        })?;

        self.set_page(url, final_url, &body);
        Ok(())
    }

    /// Resolved target of the next-page control, unless it was already visited
    fn next_page_url(&self) -> Option<Url> {
        let page = self.current.as_ref()?;
        let href = page
            .document
            .select(&self.selectors.next_page)
            .find_map(|el| el.value().attr("href"))?;
        let url = page.url.join(href).ok()?;

        if self.visited.contains(&url) {
            tracing::warn!("Next page {} was already visited, stopping", url);
            return None;
        }
        Some(url)
    }

    /// Builds the GET request the search form would submit for `keyword`
    fn search_url(&self, keyword: &str) -> DriverResult<Url> {
        let page = self.loaded()?;
        let document = &page.document;

        let input = document
            .select(&self.selectors.search_input)
            .next()
            .ok_or_else(|| DriverError::ElementNotFound("search input".to_string()))?;
        let field = input
            .value()
            .attr("name")
            .filter(|name| !name.is_empty())
            .ok_or_else(|| DriverError::ElementNotFound("name of the search input".to_string()))?;

        let form = input
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "form");

        let mut hidden = Vec::new();
        let mut url = match form {
            Some(form) => {
                let action = form.value().attr("action").unwrap_or("");
                for el in form.select(&self.selectors.hidden_input) {
                    if let Some(name) = el.value().attr("name") {
                        let value = el.value().attr("value").unwrap_or("");
                        hidden.push((name.to_string(), value.to_string()));
                    }
                }
                let mut url = join_url(&page.url, action)?;
                // A GET form replaces the action's query with its fields
                url.set_query(None);
                url
            }
            None => {
                let href = document
                    .select(&self.selectors.search_submit)
                    .find_map(|el| el.value().attr("href"))
                    .ok_or_else(|| DriverError::ElementNotFound("search form".to_string()))?;
                join_url(&page.url, href)?
            }
        };

        {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &hidden {
                pairs.append_pair(name, value);
            }
            pairs.append_pair(field, keyword);
        }

        Ok(url)
    }
}

fn join_url(base: &Url, href: &str) -> DriverResult<Url> {
    base.join(href).map_err(|source| DriverError::InvalidUrl {
        url: href.to_string(),
        source,
    })
}

/// Visible text of an element with whitespace runs collapsed
pub(crate) fn collapsed_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait(?Send)]
impl PageDriver for HttpPageDriver {
    async fn navigate(&mut self, url: &str) -> DriverResult<()> {
        let url = Url::parse(url).map_err(|source| DriverError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        self.visited.clear();
        self.load(url).await
    }

    fn title(&self) -> Option<String> {
        let document = self.document()?;
        let title_selector = Selector::parse("title").ok()?;

        document
            .select(&title_selector)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
    }

    async fn dismiss_cookie_banner(&mut self) -> DriverResult<bool> {
        let document = self.document().ok_or(DriverError::NoPageLoaded)?;
        let present = document
            .select(&self.selectors.cookie_decline)
            .next()
            .is_some();

        // Consent is enforced by script; over HTTP there is nothing to click
        if present {
            tracing::debug!("Cookie banner present, declining is implicit without scripts");
        }
        Ok(present)
    }

    async fn submit_search(&mut self, keyword: &str) -> DriverResult<()> {
        let url = self.search_url(keyword)?;
        tracing::debug!("Submitting search for '{}'", keyword);
        self.visited.clear();
        self.load(url).await
    }

    fn results_heading(&self) -> Option<String> {
        let document = self.document()?;
        document
            .select(&self.selectors.results_heading)
            .next()
            .map(collapsed_text)
    }

    fn listing_rows(&self) -> DriverResult<Vec<RawRow>> {
        let page = self.loaded()?;

        let rows = page
            .document
            .select(&self.selectors.listing_row)
            .map(|row| RawRow::new(row.html()).with_base_url(page.url.clone()))
            .collect();
        Ok(rows)
    }

    fn has_next_page(&self) -> bool {
        self.next_page_url().is_some()
    }

    async fn go_to_next_page(&mut self) -> DriverResult<()> {
        let url = self
            .next_page_url()
            .ok_or_else(|| DriverError::ElementNotFound("next page control".to_string()))?;
        self.load(url).await
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.current = None;
        self.visited.clear();
        Ok(())
    }
}
