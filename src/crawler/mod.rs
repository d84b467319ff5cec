//! Crawler module for searching and walking job-listing result pages
//!
//! This module contains the core crawling logic, including:
//! - The page driver that loads and queries result pages
//! - The extractor that turns a listing row into a record
//! - The pagination controller with its dedup stop policy
//! - The search session that ties one keyword to one sink

mod controller;
mod driver;
mod extractor;
mod session;

pub use controller::{classify, CrawlReport, CrawlSettings, PaginationController};
pub use driver::{
    build_http_client, DriverError, DriverResult, HttpPageDriver, PageDriver, RawRow,
};
pub use extractor::{ExtractionError, RecordExtractor};
pub use session::{SearchSession, SessionOutcome};

use crate::config::Config;
use crate::storage::{open_sink, SinkBackend};
use crate::CrawlerError;
use chrono::Local;
use std::time::Duration;

/// Runs one search session for `keyword`
///
/// This is the main entry point for a single crawl. It will:
/// 1. Open the selected sink
/// 2. Build the HTTP page driver
/// 3. Search the site and walk the result pages
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `keyword` - Search keyword; empty searches everything
/// * `backend` - Which sink receives the records
///
/// # Returns
///
/// * `Ok(SessionOutcome)` - Session ended normally
/// * `Err(CrawlerError)` - Session was aborted
pub async fn crawl(
    config: &Config,
    keyword: &str,
    backend: SinkBackend,
) -> Result<SessionOutcome, CrawlerError> {
    let started_at = Local::now();
    let sink = open_sink(backend, config, keyword, started_at)?;
    let mut driver = HttpPageDriver::new(config)?;

    tracing::debug!("Session '{}' writing to {}", keyword, backend.as_str());
    let mut session = SearchSession::with_start(keyword, sink, started_at);
    session.run(&mut driver, config).await
}

/// Runs sessions back to back, each with a fresh driver and sink
///
/// A failed session is logged and the next one starts after
/// `continuous-delay-secs`, whatever the failure. With `max_rounds` set the
/// loop ends after that many sessions; otherwise it runs until the task is
/// cancelled.
///
/// # Returns
///
/// The number of rounds that failed
pub async fn run_continuous(
    config: &Config,
    keyword: &str,
    backend: SinkBackend,
    max_rounds: Option<u64>,
) -> u64 {
    let delay = Duration::from_secs(config.timing.continuous_delay_secs);
    let mut round: u64 = 0;
    let mut failed: u64 = 0;

    loop {
        round += 1;
        tracing::info!("Continuous crawl round {}", round);

        if let Err(e) = crawl(config, keyword, backend).await {
            failed += 1;
            tracing::error!("Round {} failed: {}", round, e);
        }

        if max_rounds.is_some_and(|max| round >= max) {
            return failed;
        }

        tracing::debug!("Sleeping {:?} before the next round", delay);
        tokio::time::sleep(delay).await;
    }
}
