//! SQLite-backed deduplicating store
//!
//! Keyword-scoped membership sets and serialized record blobs, laid out the
//! way a key/value server would hold them:
//!
//! - one set per search keyword containing offer ids
//! - one blob per offer id containing the JSON record
//! - the set `search_words` containing every registered keyword

use crate::record::JobListingRecord;
use crate::storage::schema::{initialize_schema, SEARCH_WORDS_KEY};
use crate::storage::traits::{ClaimSet, Sink, SinkError, SinkResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const INSERT_MEMBER_SQL: &str =
    "INSERT OR IGNORE INTO set_members (set_key, member, added_at) VALUES (?1, ?2, ?3)";

const UPSERT_BLOB_SQL: &str = "INSERT INTO blobs (key, value, updated_at) VALUES (?1, ?2, ?3)
     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";

/// Deduplicating store backed by SQLite
pub struct DedupStore {
    conn: Connection,
}

impl DedupStore {
    /// Opens (or creates) the store at `path`
    ///
    /// # Returns
    ///
    /// * `Ok(DedupStore)` - Store ready for use
    /// * `Err(SinkError::Connection)` - The database could not be opened
    pub fn open(path: &Path) -> SinkResult<Self> {
        let conn = Connection::open(path).map_err(|e| {
            SinkError::Connection(format!("cannot open {}: {}", path.display(), e))
        })?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
        ",
        )
        .map_err(|e| SinkError::Connection(format!("cannot configure {}: {}", path.display(), e)))?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory store
    pub fn open_in_memory() -> SinkResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SinkError::Connection(format!("in-memory store: {}", e)))?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Adds `member` to `set_key`; returns true if it was not present
    pub fn add_member(&self, set_key: &str, member: &str) -> SinkResult<bool> {
        let inserted = self.conn.execute(
            INSERT_MEMBER_SQL,
            params![set_key, member, Utc::now().to_rfc3339()],
        )?;
        Ok(inserted == 1)
    }

    pub fn is_member(&self, set_key: &str, member: &str) -> SinkResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM set_members WHERE set_key = ?1 AND member = ?2",
                params![set_key, member],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Lists the members of a set in insertion order
    pub fn members(&self, set_key: &str) -> SinkResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT member FROM set_members WHERE set_key = ?1 ORDER BY rowid")?;

        let members = stmt
            .query_map(params![set_key], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(members)
    }

    pub fn count_members(&self, set_key: &str) -> SinkResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM set_members WHERE set_key = ?1",
            params![set_key],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Every keyword ever registered
    pub fn keywords(&self) -> SinkResult<Vec<String>> {
        self.members(SEARCH_WORDS_KEY)
    }

    /// Stores `value` under `key`, replacing any previous value
    pub fn set_blob(&self, key: &str, value: &str) -> SinkResult<()> {
        self.conn
            .execute(UPSERT_BLOB_SQL, params![key, value, Utc::now().to_rfc3339()])?;
        Ok(())
    }

    pub fn get_blob(&self, key: &str) -> SinkResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM blobs WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Loads and decodes the record stored for `offer_id`
    pub fn load_record(&self, offer_id: &str) -> SinkResult<Option<JobListingRecord>> {
        match self.get_blob(offer_id)? {
            Some(blob) => Ok(Some(serde_json::from_str(&blob)?)),
            None => Ok(None),
        }
    }

    /// Number of stored record blobs
    pub fn count_records(&self) -> SinkResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM blobs", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl Sink for DedupStore {
    fn name(&self) -> &'static str {
        "dedup-store"
    }

    fn register_keyword(&mut self, keyword: &str) -> SinkResult<()> {
        if self.add_member(SEARCH_WORDS_KEY, keyword)? {
            tracing::debug!("Registered new search keyword '{}'", keyword);
        }
        Ok(())
    }

    fn persist(&mut self, record: &JobListingRecord) -> SinkResult<()> {
        let blob = serde_json::to_string(record)?;
        self.set_blob(&record.offer_id, &blob)
    }

    fn claims(&mut self) -> Option<&mut dyn ClaimSet> {
        Some(self)
    }
}

impl ClaimSet for DedupStore {
    fn try_claim(&mut self, keyword: &str, offer_id: &str) -> SinkResult<bool> {
        // A single INSERT OR IGNORE is the test-and-set
        self.add_member(keyword, offer_id)
    }

    fn claim_and_persist(&mut self, keyword: &str, record: &JobListingRecord) -> SinkResult<bool> {
        let blob = serde_json::to_string(record)?;
        let now = Utc::now().to_rfc3339();

        // Dropping the transaction on an error path rolls the claim back
        let tx = self.conn.transaction()?;
        let claimed = tx.execute(INSERT_MEMBER_SQL, params![keyword, record.offer_id, now])? == 1;
        if claimed {
            tx.execute(UPSERT_BLOB_SQL, params![record.offer_id, blob, now])?;
        }
        tx.commit()?;

        Ok(claimed)
    }
}
