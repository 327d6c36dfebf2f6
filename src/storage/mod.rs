//! Storage module for persisting harvested listings
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Idempotent entry upserts keyed by the catalog identifier
//! - The append-only seeds/leeches time series
//! - Search, filter, sort and paginated reads joined with current stats

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{ListingStore, StorageError, StorageResult};

use crate::HarvestError;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::str::FromStr;

/// Default row cap for list queries when the caller passes `limit <= 0`
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Default row cap for stats history
pub const DEFAULT_HISTORY_LIMIT: i64 = 100;

/// Default page size for paginated reads
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Opens (or creates) the store at the given path
///
/// Failure here is the only run-fatal storage condition.
pub fn open_store(path: &Path) -> Result<SqliteStore, HarvestError> {
    SqliteStore::new(path)
}

/// Normalized persistent record for one catalog item
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub size_mb: f64,
    pub added_date: Option<DateTime<Utc>>,
    pub url: String,
    pub image_url: Option<String>,
    pub rating: u32,
    pub rating_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Returns true if every field except the bookkeeping timestamps matches
    pub fn same_content(&self, other: &Entry) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.category == other.category
            && self.size_mb == other.size_mb
            && self.added_date == other.added_date
            && self.url == other.url
            && self.image_url == other.image_url
            && self.rating == other.rating
            && self.rating_url == other.rating_url
    }
}

/// An entry together with its most recent stats sample
#[derive(Debug, Clone, PartialEq)]
pub struct EntryWithStats {
    pub entry: Entry,
    pub seeds: u32,
    pub leeches: u32,
}

/// One timestamped seeds/leeches observation
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSample {
    pub id: i64,
    pub entry_id: String,
    pub seeds: u32,
    pub leeches: u32,
    pub recorded_at: DateTime<Utc>,
}

/// Entry count for one category (`None` for uncategorized entries)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: Option<String>,
    pub count: u64,
}

/// Aggregate store statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogStats {
    pub total_entries: u64,
    pub by_category: Vec<CategoryCount>,
    pub total_samples: u64,
}

/// Sort order for paginated reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    NameAsc,
    NameDesc,
    SizeAsc,
    SizeDesc,
    SeedsDesc,
    LeechesDesc,
}

impl SortKey {
    /// ORDER BY clause for this key; `t.id` breaks ties so pages never overlap
    pub(crate) fn order_by(&self) -> &'static str {
        match self {
            Self::Newest => "ORDER BY t.updated_at DESC, t.id ASC",
            Self::Oldest => "ORDER BY t.updated_at ASC, t.id ASC",
            Self::NameAsc => "ORDER BY t.name ASC, t.id ASC",
            Self::NameDesc => "ORDER BY t.name DESC, t.id ASC",
            Self::SizeAsc => "ORDER BY t.size_mb ASC, t.id ASC",
            Self::SizeDesc => "ORDER BY t.size_mb DESC, t.id ASC",
            Self::SeedsDesc => "ORDER BY seeds DESC, t.id ASC",
            Self::LeechesDesc => "ORDER BY leeches DESC, t.id ASC",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "NEWEST",
            Self::Oldest => "OLDEST",
            Self::NameAsc => "NAME_ASC",
            Self::NameDesc => "NAME_DESC",
            Self::SizeAsc => "SIZE_ASC",
            Self::SizeDesc => "SIZE_DESC",
            Self::SeedsDesc => "SEEDS_DESC",
            Self::LeechesDesc => "LEECHES_DESC",
        }
    }
}

impl FromStr for SortKey {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "NEWEST" => Ok(Self::Newest),
            "OLDEST" => Ok(Self::Oldest),
            "NAME_ASC" => Ok(Self::NameAsc),
            "NAME_DESC" => Ok(Self::NameDesc),
            "SIZE_ASC" => Ok(Self::SizeAsc),
            "SIZE_DESC" => Ok(Self::SizeDesc),
            "SEEDS_DESC" => Ok(Self::SeedsDesc),
            "LEECHES_DESC" => Ok(Self::LeechesDesc),
            other => Err(StorageError::InvalidQuery(format!(
                "unknown sort key: {}",
                other
            ))),
        }
    }
}

/// Parameters of a paginated read
#[derive(Debug, Clone, Default)]
pub struct PageQuery {
    pub offset: i64,
    pub limit: i64,
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: SortKey,
}

/// One page of results
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<EntryWithStats>,
    /// Number of rows matching the filter, ignoring offset and limit
    pub total: u64,
    /// True if at least one more row exists after this page
    pub has_more: bool,
}
