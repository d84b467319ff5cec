//! Storage module for persisting extracted listings
//!
//! Two sinks are available:
//! - `DedupStore`: SQLite-backed membership sets and record blobs that survive
//!   across runs and let the crawler stop once it reaches known listings
//! - `AppendOnlyTable`: one CSV file per run date and keyword, re-indexed in
//!   full on every run

mod schema;
mod sqlite;
mod table;
mod traits;

pub use schema::SEARCH_WORDS_KEY;
pub use sqlite::DedupStore;
pub use table::{table_path, AppendOnlyTable};
pub use traits::{ClaimSet, Sink, SinkError, SinkResult};

use crate::config::Config;
use chrono::{DateTime, Local};
use std::path::Path;

/// Which sink a session writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkBackend {
    DedupStore,
    AppendOnlyTable,
}

impl SinkBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DedupStore => "dedup-store",
            Self::AppendOnlyTable => "append-only-table",
        }
    }
}

/// Opens the sink for one search session
///
/// # Arguments
///
/// * `backend` - Which sink to open
/// * `config` - Store and table locations
/// * `keyword` - The session's search keyword (names the table file)
/// * `started_at` - Session start (dates the table file)
///
/// # Returns
///
/// * `Ok(Box<dyn Sink>)` - Sink ready for use
/// * `Err(SinkError)` - The store could not be opened
pub fn open_sink(
    backend: SinkBackend,
    config: &Config,
    keyword: &str,
    started_at: DateTime<Local>,
) -> SinkResult<Box<dyn Sink>> {
    match backend {
        SinkBackend::DedupStore => {
            let store = DedupStore::open(Path::new(&config.store.database_path))?;
            Ok(Box::new(store))
        }
        SinkBackend::AppendOnlyTable => Ok(Box::new(AppendOnlyTable::new(
            Path::new(&config.table.output_dir),
            started_at.date_naive(),
            keyword,
        ))),
    }
}
