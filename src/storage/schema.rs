//! Database schema for the deduplicating store
//!
//! The store mirrors a key/value server with set support: membership sets
//! keyed by name, and opaque string blobs keyed by name.

/// Name of the set holding every keyword ever registered
pub const SEARCH_WORDS_KEY: &str = "search_words";

pub const SCHEMA_SQL: &str = r#"
-- Membership sets: one set per keyword plus the keyword registry
CREATE TABLE IF NOT EXISTS set_members (
    set_key TEXT NOT NULL,
    member TEXT NOT NULL,
    added_at TEXT NOT NULL,
    PRIMARY KEY (set_key, member)
);

-- Serialized records keyed by offer id
CREATE TABLE IF NOT EXISTS blobs (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Creates the tables if they do not exist yet
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
