//! Search session
//!
//! One keyword, one sink, one browsing session. The session opens the site,
//! verifies it is the expected page, submits the search and hands the result
//! pages to the [`PaginationController`]. The page driver is always closed
//! before the session returns, whatever the outcome.

use crate::config::Config;
use crate::crawler::controller::{CrawlReport, CrawlSettings, PaginationController};
use crate::crawler::driver::{DriverError, PageDriver};
use crate::crawler::extractor::RecordExtractor;
use crate::storage::Sink;
use crate::CrawlerError;
use chrono::{DateTime, Local};

/// How a session ended when nothing went wrong
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The site reported no results for the keyword
    NoResults,

    /// Result pages were walked
    Completed(CrawlReport),
}

/// One search for one keyword into one sink
pub struct SearchSession<S: Sink> {
    keyword: String,
    started_at: DateTime<Local>,
    sink: S,
}

impl<S: Sink> SearchSession<S> {
    /// Creates a session starting now
    pub fn new(keyword: impl Into<String>, sink: S) -> Self {
        Self::with_start(keyword, sink, Local::now())
    }

    pub fn with_start(keyword: impl Into<String>, sink: S, started_at: DateTime<Local>) -> Self {
        Self {
            keyword: keyword.into(),
            started_at,
            sink,
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Runs the session against `driver`
    ///
    /// The driver is closed on every path; a failure to close is logged and
    /// does not replace the session's own result.
    pub async fn run<D: PageDriver + ?Sized>(
        &mut self,
        driver: &mut D,
        config: &Config,
    ) -> Result<SessionOutcome, CrawlerError> {
        let result = self.drive(driver, config).await;

        if let Err(e) = driver.close().await {
            tracing::warn!("Failed to close page driver: {}", e);
        }

        match &result {
            Ok(SessionOutcome::Completed(report)) => {
                tracing::info!("Session '{}' finished: {}", self.keyword, report)
            }
            Ok(SessionOutcome::NoResults) => {}
            Err(e) => tracing::error!("Session '{}' failed: {}", self.keyword, e),
        }

        result
    }

    async fn drive<D: PageDriver + ?Sized>(
        &mut self,
        driver: &mut D,
        config: &Config,
    ) -> Result<SessionOutcome, CrawlerError> {
        let site = &config.site;

        tracing::info!("Opening {}", site.base_url);
        driver.navigate(&site.base_url).await?;

        let title = driver.title().unwrap_or_default();
        if title != site.expected_title {
            return Err(CrawlerError::Environment(format!(
                "unexpected page title '{}', expected '{}'",
                title, site.expected_title
            )));
        }

        if !driver.dismiss_cookie_banner().await? {
            tracing::debug!("No cookie banner on {}", site.base_url);
        }

        tracing::info!("Searching for '{}'", self.keyword);
        driver
            .submit_search(&self.keyword)
            .await
            .map_err(|e| match e {
                DriverError::ElementNotFound(what) => {
                    CrawlerError::Environment(format!("search control missing: {}", what))
                }
                other => other.into(),
            })?;

        let heading = match driver.results_heading() {
            Some(heading) => heading,
            None => {
                tracing::info!("No results for '{}'", self.keyword);
                return Ok(SessionOutcome::NoResults);
            }
        };
        if !heading
            .to_uppercase()
            .starts_with(&site.results_heading_prefix.to_uppercase())
        {
            return Err(CrawlerError::Environment(format!(
                "unexpected results heading '{}'",
                heading
            )));
        }
        tracing::debug!("Results heading: {}", heading);

        self.sink.register_keyword(&self.keyword)?;

        let extractor = RecordExtractor::new(&config.selectors)?;
        let settings = CrawlSettings::from_config(config);
        let report =
            PaginationController::new(driver, &mut self.sink, &extractor, &settings, &self.keyword)
                .run()
                .await?;

        Ok(SessionOutcome::Completed(report))
    }
}
