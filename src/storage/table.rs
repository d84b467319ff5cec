//! Append-only CSV table
//!
//! One flat file per run date and keyword. The header row is written once,
//! when the file is first created; every persisted record appends one row.
//! The table keeps no cross-run state, so it offers no claim capability.

use crate::record::{JobListingRecord, FIELD_NAMES};
use crate::storage::traits::{Sink, SinkResult};
use chrono::NaiveDate;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Append-only table sink
pub struct AppendOnlyTable {
    path: PathBuf,
}

impl AppendOnlyTable {
    /// Creates a table for `keyword` searched on `run_date`
    ///
    /// Nothing is written until the first record is persisted.
    pub fn new(output_dir: &Path, run_date: NaiveDate, keyword: &str) -> Self {
        Self {
            path: table_path(output_dir, run_date, keyword),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// File name for a run date and keyword: `<YYYY-MM-DD> <keyword>.csv`
///
/// Path separators in the keyword are replaced so the file always lands in
/// `output_dir`.
pub fn table_path(output_dir: &Path, run_date: NaiveDate, keyword: &str) -> PathBuf {
    let keyword: String = keyword
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    output_dir.join(format!("{} {}.csv", run_date.format("%Y-%m-%d"), keyword))
}

impl Sink for AppendOnlyTable {
    fn name(&self) -> &'static str {
        "append-only-table"
    }

    fn register_keyword(&mut self, _keyword: &str) -> SinkResult<()> {
        Ok(())
    }

    fn persist(&mut self, record: &JobListingRecord) -> SinkResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            tracing::debug!("Creating table {}", self.path.display());
            writer.write_record(FIELD_NAMES)?;
        }
        writer.write_record(record.to_row())?;
        writer.flush()?;

        Ok(())
    }
}
