//! Job listing record
//!
//! One scraped posting, as produced by the extractor and consumed by sinks.

use serde::{Deserialize, Serialize};

/// Column order shared by every persisted form of a record
pub const FIELD_NAMES: [&str; 7] = [
    "offer_id",
    "offer_link",
    "employer",
    "job_title",
    "job_location",
    "salary",
    "info",
];

/// A single job posting
///
/// Field declaration order matches [`FIELD_NAMES`]; serialized blobs rely on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobListingRecord {
    /// Site-assigned identifier, the primary dedup key
    pub offer_id: String,

    /// Absolute URL of the posting
    pub offer_link: String,

    pub employer: String,

    pub job_title: String,

    pub job_location: String,

    /// Absent when the listing has no salary badge
    pub salary: Option<String>,

    /// Whitespace-tokenized freshness/info line
    pub info: Vec<String>,
}

impl JobListingRecord {
    /// First token of the info line, if any
    pub fn info_marker(&self) -> Option<&str> {
        self.info.first().map(String::as_str)
    }

    /// Renders the record as a flat row in [`FIELD_NAMES`] order
    ///
    /// A missing salary becomes an empty cell and the info tokens are joined
    /// with single spaces.
    pub fn to_row(&self) -> [String; 7] {
        [
            self.offer_id.clone(),
            self.offer_link.clone(),
            self.employer.clone(),
            self.job_title.clone(),
            self.job_location.clone(),
            self.salary.clone().unwrap_or_default(),
            self.info.join(" "),
        ]
    }
}
