//! Record extractor
//!
//! Turns one listing row snapshot into a [`JobListingRecord`]:
//! - `offer_id`, `job_title`, `employer` and `job_location` are mandatory
//! - `salary` is optional and absent when the row has no salary badge
//! - `info` is split on whitespace without interpreting its contents

use crate::config::{parse_selector, SelectorConfig};
use crate::crawler::driver::{collapsed_text, RawRow};
use crate::record::JobListingRecord;
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// A listing row that cannot become a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("listing row is missing mandatory field '{0}'")]
    MissingField(&'static str),
}

/// Compiled row-level selectors
pub struct RecordExtractor {
    title: Selector,
    offer_link: Selector,
    employer: Selector,
    job_location: Selector,
    salary: Selector,
    info: Selector,
}

impl RecordExtractor {
    /// Compiles the row-level selectors from configuration
    pub fn new(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            title: parse_selector("title", &config.title)?,
            offer_link: parse_selector("offer-link", &config.offer_link)?,
            employer: parse_selector("employer", &config.employer)?,
            job_location: parse_selector("job-location", &config.job_location)?,
            salary: parse_selector("salary", &config.salary)?,
            info: parse_selector("info", &config.info)?,
        })
    }

    /// Extracts a record from one listing row
    ///
    /// # Returns
    ///
    /// * `Ok(JobListingRecord)` - All mandatory fields were found
    /// * `Err(ExtractionError)` - The row lacks a mandatory field
    ///
    /// # Example
    ///
    /// ```
    /// use profesia_crawler::config::SelectorConfig;
    /// use profesia_crawler::crawler::{RawRow, RecordExtractor};
    ///
    /// let extractor = RecordExtractor::new(&SelectorConfig::default()).unwrap();
    /// let row = RawRow::new(
    ///     r#"<li class="list-row"><h2><a id="offer1" href="https://example.com/o/1">Welder</a></h2>
    ///     <span class="employer">ACME</span><span class="job-location">Nitra</span>
    ///     <span class="info">Pred 3 dňami</span></li>"#,
    /// );
    /// let record = extractor.extract(&row).unwrap();
    /// assert_eq!(record.offer_id, "offer1");
    /// assert_eq!(record.info, vec!["Pred", "3", "dňami"]);
    /// ```
    pub fn extract(&self, row: &RawRow) -> Result<JobListingRecord, ExtractionError> {
        let fragment = Html::parse_fragment(&row.html);
        let root = fragment.root_element();

        let link = root.select(&self.offer_link).next();
        let offer_id = link
            .and_then(|a| a.value().id())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(ExtractionError::MissingField("offer_id"))?
            .to_string();

        let job_title = required_text(root, &self.title, "job_title")?;
        let employer = required_text(root, &self.employer, "employer")?;
        let job_location = required_text(root, &self.job_location, "job_location")?;

        let offer_link = link
            .and_then(|a| a.value().attr("href"))
            .map(|href| absolute_link(row.base_url.as_ref(), href))
            .unwrap_or_default();

        let salary = root
            .select(&self.salary)
            .next()
            .map(collapsed_text)
            .filter(|s| !s.is_empty());

        let info = root
            .select(&self.info)
            .next()
            .map(|el| {
                el.text()
                    .flat_map(str::split_whitespace)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(JobListingRecord {
            offer_id,
            offer_link,
            employer,
            job_title,
            job_location,
            salary,
            info,
        })
    }
}

fn required_text(
    root: ElementRef<'_>,
    selector: &Selector,
    field: &'static str,
) -> Result<String, ExtractionError> {
    root.select(selector)
        .next()
        .map(collapsed_text)
        .ok_or(ExtractionError::MissingField(field))
}

/// Resolves `href` against the row's page; unresolvable links are kept verbatim
fn absolute_link(base: Option<&Url>, href: &str) -> String {
    match base {
        Some(base) => base
            .join(href)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| href.to_string()),
        None => href.to_string(),
    }
}
