//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Listing-Harvester database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per catalog item, keyed by the catalog's own identifier
CREATE TABLE IF NOT EXISTS entries (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    category TEXT,
    size_mb REAL NOT NULL CHECK (size_mb >= 0),
    added_date TEXT,
    url TEXT NOT NULL,
    image_url TEXT,
    rating INTEGER NOT NULL DEFAULT 0,
    rating_url TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entries_category ON entries(category);
CREATE INDEX IF NOT EXISTS idx_entries_updated_at ON entries(updated_at);

-- Append-only seeds/leeches observations
CREATE TABLE IF NOT EXISTS stats_samples (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_id TEXT NOT NULL REFERENCES entries(id),
    seeds INTEGER NOT NULL,
    leeches INTEGER NOT NULL,
    recorded_at TEXT NOT NULL,
    UNIQUE(entry_id, recorded_at) ON CONFLICT REPLACE
);

CREATE INDEX IF NOT EXISTS idx_stats_entry_recorded ON stats_samples(entry_id, recorded_at DESC);

-- Full-text shadow index over entries
CREATE VIRTUAL TABLE IF NOT EXISTS entries_fts USING fts5(
    name,
    category,
    content='entries',
    content_rowid='rowid'
);

CREATE TRIGGER IF NOT EXISTS entries_fts_insert AFTER INSERT ON entries BEGIN
    INSERT INTO entries_fts(rowid, name, category) VALUES (new.rowid, new.name, new.category);
END;

CREATE TRIGGER IF NOT EXISTS entries_fts_update AFTER UPDATE ON entries BEGIN
    INSERT INTO entries_fts(entries_fts, rowid, name, category)
        VALUES ('delete', old.rowid, old.name, old.category);
    INSERT INTO entries_fts(rowid, name, category) VALUES (new.rowid, new.name, new.category);
END;

CREATE TRIGGER IF NOT EXISTS entries_fts_delete AFTER DELETE ON entries BEGIN
    INSERT INTO entries_fts(entries_fts, rowid, name, category)
        VALUES ('delete', old.rowid, old.name, old.category);
END;
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Gets the current schema version
pub fn get_schema_version() -> u32 {
    1
}
