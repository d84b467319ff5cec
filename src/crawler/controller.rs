//! Pagination and deduplication controller
//!
//! Walks the result pages of one search and decides, row by row, whether to
//! persist, skip, or stop. For every row in page order:
//!
//! 1. Claim the offer id for the keyword (sinks without a claim capability
//!    treat every row as new)
//! 2. New: persist it
//! 3. Already claimed and the info line starts with the freshness marker:
//!    the listing was bumped by an update; skip it and keep going
//! 4. Already claimed without the marker: everything from here on is known;
//!    stop the row loop and the page loop
//!
//! When no row stops the walk, the controller follows the next-page control
//! until there is none.

use crate::config::Config;
use crate::crawler::driver::PageDriver;
use crate::crawler::extractor::RecordExtractor;
use crate::record::JobListingRecord;
use crate::state::{CrawlState, CrawlStep, HaltReason, RowOutcome};
use crate::storage::{Sink, SinkResult};
use crate::CrawlerError;
use std::fmt;
use std::time::Duration;

/// Stop policy and pacing for one walk
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Info token marking a listing that was re-surfaced by an update
    pub freshness_marker: String,

    /// Pause before following the next-page control
    pub settle_delay: Duration,
}

impl CrawlSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            freshness_marker: config.site.freshness_marker.clone(),
            settle_delay: Duration::from_millis(config.timing.settle_delay_ms),
        }
    }
}

/// Counters for one pagination walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub pages_visited: u32,
    pub rows_seen: u64,
    pub persisted: u64,
    pub fresh_duplicates: u64,
    pub malformed_rows: u64,
    pub halt: Option<HaltReason>,
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages, {} rows, {} persisted, {} fresh duplicates, {} malformed",
            self.pages_visited,
            self.rows_seen,
            self.persisted,
            self.fresh_duplicates,
            self.malformed_rows
        )?;
        if let Some(halt) = &self.halt {
            write!(f, "; {}", halt)?;
        }
        Ok(())
    }
}

/// Claims one record and persists it if it is new
///
/// # Arguments
///
/// * `sink` - Where new records go
/// * `keyword` - Scope of the claim
/// * `record` - The extracted record
/// * `freshness_marker` - Info token that marks an updated listing
pub fn classify<S: Sink + ?Sized>(
    sink: &mut S,
    keyword: &str,
    record: &JobListingRecord,
    freshness_marker: &str,
) -> SinkResult<RowOutcome> {
    let claimed = match sink.claims() {
        Some(claims) => claims.claim_and_persist(keyword, record)?,
        None => {
            sink.persist(record)?;
            true
        }
    };

    if claimed {
        return Ok(RowOutcome::New);
    }

    if record.info_marker() == Some(freshness_marker) {
        Ok(RowOutcome::DuplicateFresh)
    } else {
        Ok(RowOutcome::DuplicateStale)
    }
}

/// Drives one pagination walk over the page driver's current search
pub struct PaginationController<'a, D: PageDriver + ?Sized, S: Sink + ?Sized> {
    driver: &'a mut D,
    sink: &'a mut S,
    extractor: &'a RecordExtractor,
    settings: &'a CrawlSettings,
    keyword: &'a str,
    state: CrawlState,
    report: CrawlReport,
}

impl<'a, D: PageDriver + ?Sized, S: Sink + ?Sized> PaginationController<'a, D, S> {
    /// Creates a controller positioned on the first result page
    pub fn new(
        driver: &'a mut D,
        sink: &'a mut S,
        extractor: &'a RecordExtractor,
        settings: &'a CrawlSettings,
        keyword: &'a str,
    ) -> Self {
        Self {
            driver,
            sink,
            extractor,
            settings,
            keyword,
            state: CrawlState::FetchingPage,
            report: CrawlReport::default(),
        }
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    /// Runs the walk to completion
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The walk ended on a stale duplicate or the last page
    /// * `Err(CrawlerError)` - The driver or sink failed; the walk is abandoned
    pub async fn run(mut self) -> Result<CrawlReport, CrawlerError> {
        tracing::info!(
            "Crawling results for '{}' into {} (deduplicating: {})",
            self.keyword,
            self.sink.name(),
            self.sink.claims().is_some()
        );

        loop {
            self.report.pages_visited += 1;
            let page = self.report.pages_visited;

            self.transition(CrawlState::ExtractingRows);
            let records = self.extract_page()?;

            self.transition(CrawlState::Claiming);
            let persisted_before = self.report.persisted;
            let step = self.process_records(&records)?;

            tracing::info!(
                "Page {}: {} rows, {} persisted",
                page,
                records.len(),
                self.report.persisted - persisted_before
            );

            if step == CrawlStep::HaltCrawl {
                self.transition(CrawlState::Halted);
                break;
            }

            self.transition(CrawlState::PageDecision);
            if !self.driver.has_next_page() {
                tracing::info!("No next page after page {}", page);
                self.report.halt = Some(HaltReason::LastPage);
                self.transition(CrawlState::Halted);
                break;
            }

            if !self.settings.settle_delay.is_zero() {
                tokio::time::sleep(self.settings.settle_delay).await;
            }

            self.transition(CrawlState::FetchingPage);
            self.driver.go_to_next_page().await?;
        }

        if let Some(halt) = &self.report.halt {
            tracing::info!("Crawl for '{}' stopped: {}", self.keyword, halt);
        }

        Ok(self.report)
    }

    /// Extracts every well-formed row on the current page
    fn extract_page(&mut self) -> Result<Vec<JobListingRecord>, CrawlerError> {
        let rows = self.driver.listing_rows()?;
        let mut records = Vec::with_capacity(rows.len());

        for (index, row) in rows.iter().enumerate() {
            match self.extractor.extract(row) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(
                        "Skipping row {} on page {}: {}",
                        index + 1,
                        self.report.pages_visited,
                        e
                    );
                    self.report.malformed_rows += 1;
                }
            }
        }

        Ok(records)
    }

    /// Claims rows in page order until one of them stops the walk
    fn process_records(&mut self, records: &[JobListingRecord]) -> Result<CrawlStep, CrawlerError> {
        for record in records {
            self.report.rows_seen += 1;

            let outcome = classify(
                &mut *self.sink,
                self.keyword,
                record,
                &self.settings.freshness_marker,
            )?;
            tracing::debug!("Offer {}: {:?}", record.offer_id, outcome);

            match outcome {
                RowOutcome::New => self.report.persisted += 1,
                RowOutcome::DuplicateFresh => self.report.fresh_duplicates += 1,
                RowOutcome::DuplicateStale => {
                    self.report.halt = Some(HaltReason::StaleDuplicate {
                        offer_id: record.offer_id.clone(),
                    });
                }
            }

            if outcome.step() == CrawlStep::HaltCrawl {
                return Ok(CrawlStep::HaltCrawl);
            }
        }

        Ok(CrawlStep::Continue)
    }

    fn transition(&mut self, next: CrawlState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid crawl transition {} -> {}",
            self.state,
            next
        );
        tracing::trace!("Crawl state {} -> {}", self.state, next);
        self.state = next;
    }
}
