//! Storage traits and error types
//!
//! This module defines the trait interface for listing stores and
//! associated error types.

use crate::storage::{CatalogStats, Entry, EntryWithStats, Page, PageQuery, StatsSample};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for listing store implementations
///
/// Implementations must tolerate concurrent calls from several workers; every
/// method is atomic on its own and no transaction spans multiple calls.
pub trait ListingStore: Send + Sync {
    // ===== Writes =====

    /// Inserts an entry, or overwrites every mutable field of an existing one
    ///
    /// `created_at` of an existing row is preserved and `updated_at` is set to
    /// now. Re-ingesting a known identifier is the normal case, not an error.
    fn upsert_entry(&self, entry: &Entry) -> StorageResult<()>;

    /// Appends one seeds/leeches sample stamped with the current time
    fn record_stats(&self, entry_id: &str, seeds: u32, leeches: u32) -> StorageResult<()>;

    // ===== Reads =====

    /// Gets one entry with its latest sample (zero/zero without samples)
    fn current_stats_for(&self, entry_id: &str) -> StorageResult<Option<EntryWithStats>>;

    /// Substring search over name and category, newest-updated first
    fn search(&self, text: &str, limit: i64) -> StorageResult<Vec<EntryWithStats>>;

    /// Entries in one category, newest-updated first
    fn by_category(&self, category: &str, limit: i64) -> StorageResult<Vec<EntryWithStats>>;

    /// Most recently updated entries
    fn recent(&self, limit: i64) -> StorageResult<Vec<EntryWithStats>>;

    /// Samples for one entry, newest first
    fn stats_history(&self, entry_id: &str, limit: i64) -> StorageResult<Vec<StatsSample>>;

    /// Filtered, sorted, windowed read with a total count and lookahead flag
    fn paginate(&self, query: &PageQuery) -> StorageResult<Page>;

    /// Entry count, per-category counts and sample count
    fn aggregate_stats(&self) -> StorageResult<CatalogStats>;

    /// Ranked full-text search over the shadow index
    fn full_text_search(&self, query: &str, limit: i64) -> StorageResult<Vec<EntryWithStats>>;

    /// Entries whose rating link contains `fragment`
    fn by_rating_link(&self, fragment: &str, limit: i64) -> StorageResult<Vec<EntryWithStats>>;
}
