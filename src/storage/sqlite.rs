//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ListingStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ListingStore, StorageError, StorageResult};
use crate::storage::{
    CatalogStats, CategoryCount, Entry, EntryWithStats, Page, PageQuery, StatsSample,
    DEFAULT_HISTORY_LIMIT, DEFAULT_LIST_LIMIT, DEFAULT_PAGE_SIZE,
};
use crate::HarvestError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Entry columns followed by the latest sample's counters
const ENTRY_COLUMNS: &str = "
    SELECT t.id, t.name, t.category, t.size_mb, t.added_date, t.url, t.image_url,
           t.rating, t.rating_url, t.created_at, t.updated_at,
           COALESCE(s.seeds, 0) AS seeds, COALESCE(s.leeches, 0) AS leeches
    FROM entries t";

/// Latest sample per entry, ranked by recency
const LATEST_STATS_JOIN: &str = "
    LEFT JOIN (
        SELECT entry_id, seeds, leeches,
               ROW_NUMBER() OVER (PARTITION BY entry_id ORDER BY recorded_at DESC, id DESC) AS rn
        FROM stats_samples
    ) s ON t.id = s.entry_id AND s.rn = 1";

/// SQLite storage backend
///
/// The connection sits behind a mutex so one handle can be shared across
/// crawl workers.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Creates a new SqliteStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database or create the schema
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Runs an entry-with-stats query and collects every row
    fn query_entries(&self, sql: &str, args: Vec<Value>) -> StorageResult<Vec<EntryWithStats>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params_from_iter(args), entry_with_stats_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl ListingStore for SqliteStore {
    // ===== Writes =====

    fn upsert_entry(&self, entry: &Entry) -> StorageResult<()> {
        if entry.id.trim().is_empty() {
            return Err(StorageError::InvalidEntry(
                "entry identifier is empty".to_string(),
            ));
        }
        if !entry.size_mb.is_finite() || entry.size_mb < 0.0 {
            return Err(StorageError::InvalidEntry(format!(
                "size_mb must be a non-negative number, got {} for {}",
                entry.size_mb, entry.id
            )));
        }

        let now = format_timestamp(&Utc::now());
        let added_date = entry.added_date.as_ref().map(format_timestamp);

        self.conn()?.execute(
            "INSERT INTO entries (
                id, name, category, size_mb, added_date, url,
                image_url, rating, rating_url, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                size_mb = excluded.size_mb,
                added_date = excluded.added_date,
                url = excluded.url,
                image_url = excluded.image_url,
                rating = excluded.rating,
                rating_url = excluded.rating_url,
                updated_at = excluded.updated_at",
            params![
                entry.id,
                entry.name,
                entry.category,
                entry.size_mb,
                added_date,
                entry.url,
                entry.image_url,
                entry.rating,
                entry.rating_url,
                now,
            ],
        )?;
        Ok(())
    }

    fn record_stats(&self, entry_id: &str, seeds: u32, leeches: u32) -> StorageResult<()> {
        let now = format_timestamp(&Utc::now());
        self.conn()?.execute(
            "INSERT INTO stats_samples (entry_id, seeds, leeches, recorded_at) VALUES (?1, ?2, ?3, ?4)",
            params![entry_id, seeds, leeches, now],
        )?;
        Ok(())
    }

    // ===== Reads =====

    fn current_stats_for(&self, entry_id: &str) -> StorageResult<Option<EntryWithStats>> {
        let sql = format!("{} {} WHERE t.id = ?1", ENTRY_COLUMNS, LATEST_STATS_JOIN);
        let conn = self.conn()?;
        let entry = conn
            .query_row(&sql, params![entry_id], entry_with_stats_from_row)
            .optional()?;
        Ok(entry)
    }

    fn search(&self, text: &str, limit: i64) -> StorageResult<Vec<EntryWithStats>> {
        let sql = format!(
            "{} {} WHERE (t.name LIKE ?1 OR t.category LIKE ?1) ORDER BY t.updated_at DESC, t.id ASC LIMIT ?2",
            ENTRY_COLUMNS, LATEST_STATS_JOIN
        );
        let term = format!("%{}%", text);
        self.query_entries(
            &sql,
            vec![
                Value::Text(term),
                Value::Integer(effective_limit(limit, DEFAULT_LIST_LIMIT)),
            ],
        )
    }

    fn by_category(&self, category: &str, limit: i64) -> StorageResult<Vec<EntryWithStats>> {
        let sql = format!(
            "{} {} WHERE t.category = ?1 ORDER BY t.updated_at DESC, t.id ASC LIMIT ?2",
            ENTRY_COLUMNS, LATEST_STATS_JOIN
        );
        self.query_entries(
            &sql,
            vec![
                Value::Text(category.to_string()),
                Value::Integer(effective_limit(limit, DEFAULT_LIST_LIMIT)),
            ],
        )
    }

    fn recent(&self, limit: i64) -> StorageResult<Vec<EntryWithStats>> {
        let sql = format!(
            "{} {} ORDER BY t.updated_at DESC, t.id ASC LIMIT ?1",
            ENTRY_COLUMNS, LATEST_STATS_JOIN
        );
        self.query_entries(
            &sql,
            vec![Value::Integer(effective_limit(limit, DEFAULT_LIST_LIMIT))],
        )
    }

    fn stats_history(&self, entry_id: &str, limit: i64) -> StorageResult<Vec<StatsSample>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, entry_id, seeds, leeches, recorded_at
             FROM stats_samples
             WHERE entry_id = ?1
             ORDER BY recorded_at DESC, id DESC
             LIMIT ?2",
        )?;

        let samples = stmt
            .query_map(
                params![entry_id, effective_limit(limit, DEFAULT_HISTORY_LIMIT)],
                |row| {
                    Ok(StatsSample {
                        id: row.get(0)?,
                        entry_id: row.get(1)?,
                        seeds: row.get(2)?,
                        leeches: row.get(3)?,
                        recorded_at: parse_timestamp(4, &row.get::<_, String>(4)?)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(samples)
    }

    fn paginate(&self, query: &PageQuery) -> StorageResult<Page> {
        let limit = effective_limit(query.limit, DEFAULT_PAGE_SIZE);
        let offset = query.offset.max(0);

        let mut clauses = Vec::new();
        let mut args = Vec::new();

        if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
            clauses.push("(t.name LIKE ? OR t.category LIKE ?)");
            let term = format!("%{}%", search);
            args.push(Value::Text(term.clone()));
            args.push(Value::Text(term));
        }
        if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
            clauses.push("t.category = ?");
            args.push(Value::Text(category.to_string()));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let total: i64 = {
            let conn = self.conn()?;
            conn.query_row(
                &format!("SELECT COUNT(*) FROM entries t {}", where_clause),
                params_from_iter(args.iter()),
                |row| row.get(0),
            )?
        };

        // One extra row tells us whether another page exists
        let sql = format!(
            "{} {} {} {} LIMIT ? OFFSET ?",
            ENTRY_COLUMNS,
            LATEST_STATS_JOIN,
            where_clause,
            query.sort.order_by()
        );
        args.push(Value::Integer(limit.saturating_add(1)));
        args.push(Value::Integer(offset));

        let mut items = self.query_entries(&sql, args)?;
        let has_more = items.len() as i64 > limit;
        items.truncate(usize::try_from(limit).unwrap_or(usize::MAX));

        Ok(Page {
            items,
            total: total as u64,
            has_more,
        })
    }

    fn aggregate_stats(&self) -> StorageResult<CatalogStats> {
        let conn = self.conn()?;

        let total_entries: i64 =
            conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*) AS count FROM entries
             GROUP BY category
             ORDER BY count DESC, category ASC",
        )?;
        let by_category = stmt
            .query_map([], |row| {
                Ok(CategoryCount {
                    category: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let total_samples: i64 =
            conn.query_row("SELECT COUNT(*) FROM stats_samples", [], |row| row.get(0))?;

        Ok(CatalogStats {
            total_entries: total_entries as u64,
            by_category,
            total_samples: total_samples as u64,
        })
    }

    fn full_text_search(&self, query: &str, limit: i64) -> StorageResult<Vec<EntryWithStats>> {
        let Some(match_expr) = fts_match_expression(query) else {
            return Ok(Vec::new());
        };

        let sql = format!(
            "{} JOIN entries_fts ON entries_fts.rowid = t.rowid {}
             WHERE entries_fts MATCH ?1
             ORDER BY entries_fts.rank, t.id
             LIMIT ?2",
            ENTRY_COLUMNS, LATEST_STATS_JOIN
        );
        self.query_entries(
            &sql,
            vec![
                Value::Text(match_expr),
                Value::Integer(effective_limit(limit, DEFAULT_LIST_LIMIT)),
            ],
        )
    }

    fn by_rating_link(&self, fragment: &str, limit: i64) -> StorageResult<Vec<EntryWithStats>> {
        let sql = format!(
            "{} {} WHERE t.rating_url LIKE ?1 ORDER BY t.updated_at DESC, t.id ASC LIMIT ?2",
            ENTRY_COLUMNS, LATEST_STATS_JOIN
        );
        self.query_entries(
            &sql,
            vec![
                Value::Text(format!("%{}%", fragment)),
                Value::Integer(effective_limit(limit, DEFAULT_LIST_LIMIT)),
            ],
        )
    }
}

fn effective_limit(limit: i64, default: i64) -> i64 {
    if limit <= 0 {
        default
    } else {
        limit
    }
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Turns free text into a prefix-matching FTS5 expression
///
/// Each whitespace-separated term is quoted so user input can never form FTS
/// syntax; terms are ANDed.
fn fts_match_expression(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|term| format!("\"{}\"*", term.replace('"', "\"\"")))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

fn entry_with_stats_from_row(row: &Row<'_>) -> rusqlite::Result<EntryWithStats> {
    let added_date = row
        .get::<_, Option<String>>(4)?
        .map(|raw| parse_timestamp(4, &raw))
        .transpose()?;

    Ok(EntryWithStats {
        entry: Entry {
            id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            size_mb: row.get(3)?,
            added_date,
            url: row.get(5)?,
            image_url: row.get(6)?,
            rating: row.get(7)?,
            rating_url: row.get(8)?,
            created_at: parse_timestamp(9, &row.get::<_, String>(9)?)?,
            updated_at: parse_timestamp(10, &row.get::<_, String>(10)?)?,
        },
        seeds: row.get(11)?,
        leeches: row.get(12)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SortKey;
    use chrono::TimeZone;
    use std::thread::sleep;
    use std::time::Duration;

    fn entry(id: &str, name: &str, category: Option<&str>, size_mb: f64) -> Entry {
        Entry {
            id: id.to_string(),
            name: name.to_string(),
            category: category.map(str::to_string),
            size_mb,
            added_date: Some(Utc.with_ymd_and_hms(2025, 7, 2, 0, 0, 0).unwrap()),
            url: format!("https://catalog.example.com/torrent/details.php?id={}", id),
            image_url: Some(format!("https://img.example.com/{}.jpg", id)),
            rating: 0,
            rating_url: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn tick() {
        sleep(Duration::from_millis(3));
    }

    #[test]
    fn test_create_in_memory() {
        let store = SqliteStore::new_in_memory();
        assert!(store.is_ok());
    }

    #[test]
    fn test_entry_roundtrip() {
        let store = SqliteStore::new_in_memory().unwrap();
        let mut original = entry("abc", "Film X = CSFD 77%", Some("Filmy CZ/SK dabing"), 7065.6);
        original.rating = 77;
        original.rating_url = "https://www.csfd.cz/film/12345-film-x/".to_string();
        store.upsert_entry(&original).unwrap();

        let loaded = store.current_stats_for("abc").unwrap().unwrap();
        assert!(loaded.entry.same_content(&original));
        assert_eq!(loaded.seeds, 0);
        assert_eq!(loaded.leeches, 0);
    }

    #[test]
    fn test_entry_roundtrip_without_optional_fields() {
        let store = SqliteStore::new_in_memory().unwrap();
        let mut original = entry("bare", "Bare", None, 0.0);
        original.added_date = None;
        original.image_url = None;
        store.upsert_entry(&original).unwrap();

        let loaded = store.current_stats_for("bare").unwrap().unwrap();
        assert!(loaded.entry.same_content(&original));
    }

    #[test]
    fn test_missing_entry_is_none() {
        let store = SqliteStore::new_in_memory().unwrap();
        assert!(store.current_stats_for("nope").unwrap().is_none());
    }

    #[test]
    fn test_upsert_is_idempotent_and_preserves_created_at() {
        let store = SqliteStore::new_in_memory().unwrap();
        let e = entry("dup", "Same", Some("Filmy"), 100.0);

        store.upsert_entry(&e).unwrap();
        let first = store.current_stats_for("dup").unwrap().unwrap().entry;
        tick();
        store.upsert_entry(&e).unwrap();
        let second = store.current_stats_for("dup").unwrap().unwrap().entry;

        assert!(first.same_content(&second));
        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!(store.aggregate_stats().unwrap().total_entries, 1);
    }

    #[test]
    fn test_upsert_overwrites_mutable_fields() {
        let store = SqliteStore::new_in_memory().unwrap();
        store
            .upsert_entry(&entry("x", "Old", Some("Filmy"), 1.0))
            .unwrap();
        let mut changed = entry("x", "New", Some("Serialy"), 2.0);
        changed.rating = 80;
        store.upsert_entry(&changed).unwrap();

        let loaded = store.current_stats_for("x").unwrap().unwrap().entry;
        assert_eq!(loaded.name, "New");
        assert_eq!(loaded.category.as_deref(), Some("Serialy"));
        assert_eq!(loaded.size_mb, 2.0);
        assert_eq!(loaded.rating, 80);
    }

    #[test]
    fn test_upsert_rejects_invalid_entries() {
        let store = SqliteStore::new_in_memory().unwrap();
        assert!(matches!(
            store.upsert_entry(&entry("", "No id", None, 1.0)),
            Err(StorageError::InvalidEntry(_))
        ));
        assert!(matches!(
            store.upsert_entry(&entry("neg", "Negative", None, -1.0)),
            Err(StorageError::InvalidEntry(_))
        ));
    }

    #[test]
    fn test_current_stats_is_latest_sample() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.upsert_entry(&entry("s", "S", None, 1.0)).unwrap();

        store.record_stats("s", 10, 2).unwrap();
        tick();
        store.record_stats("s", 3, 9).unwrap();

        let current = store.current_stats_for("s").unwrap().unwrap();
        assert_eq!((current.seeds, current.leeches), (3, 9));
    }

    #[test]
    fn test_stats_history_newest_first() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.upsert_entry(&entry("h", "H", None, 1.0)).unwrap();

        for seeds in [10, 15, 20] {
            store.record_stats("h", seeds, 1).unwrap();
            tick();
        }

        let history = store.stats_history("h", 10).unwrap();
        let seeds: Vec<u32> = history.iter().map(|s| s.seeds).collect();
        assert_eq!(seeds, vec![20, 15, 10]);
        assert!(history[0].recorded_at >= history[1].recorded_at);

        let capped = store.stats_history("h", 2).unwrap();
        assert_eq!(capped.len(), 2);
        assert_eq!(capped[0].seeds, 20);
    }

    #[test]
    fn test_record_stats_requires_entry() {
        let store = SqliteStore::new_in_memory().unwrap();
        assert!(store.record_stats("ghost", 1, 1).is_err());
    }

    #[test]
    fn test_search_by_name_and_category() {
        let store = SqliteStore::new_in_memory().unwrap();
        store
            .upsert_entry(&entry("1", "Matrix Reloaded", Some("Filmy"), 1.0))
            .unwrap();
        store
            .upsert_entry(&entry("2", "Dune", Some("Filmy Matrix"), 1.0))
            .unwrap();
        store
            .upsert_entry(&entry("3", "Office", Some("Serialy"), 1.0))
            .unwrap();

        let found = store.search("Matrix", 0).unwrap();
        let mut ids: Vec<_> = found.iter().map(|e| e.entry.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["1", "2"]);

        assert_eq!(store.search("Matrix", 1).unwrap().len(), 1);
    }

    #[test]
    fn test_by_category_and_recent_order() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.upsert_entry(&entry("a", "A", Some("Filmy"), 1.0)).unwrap();
        tick();
        store.upsert_entry(&entry("b", "B", Some("Serialy"), 1.0)).unwrap();
        tick();
        store.upsert_entry(&entry("c", "C", Some("Filmy"), 1.0)).unwrap();

        let films: Vec<_> = store
            .by_category("Filmy", 10)
            .unwrap()
            .into_iter()
            .map(|e| e.entry.id)
            .collect();
        assert_eq!(films, vec!["c", "a"]);

        let recent: Vec<_> = store
            .recent(2)
            .unwrap()
            .into_iter()
            .map(|e| e.entry.id)
            .collect();
        assert_eq!(recent, vec!["c", "b"]);
    }

    #[test]
    fn test_paginate_has_more_lookahead() {
        let store = SqliteStore::new_in_memory().unwrap();
        for i in 0..5 {
            store
                .upsert_entry(&entry(&format!("p{}", i), &format!("Item {}", i), Some("Filmy"), i as f64))
                .unwrap();
        }

        let query = PageQuery {
            limit: 2,
            sort: SortKey::NameAsc,
            ..PageQuery::default()
        };
        let first = store.paginate(&query).unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.total, 5);
        assert!(first.has_more);
        assert_eq!(first.items[0].entry.name, "Item 0");

        let last = store
            .paginate(&PageQuery {
                offset: 4,
                ..query.clone()
            })
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert!(!last.has_more);

        let exact = store
            .paginate(&PageQuery {
                offset: 3,
                ..query
            })
            .unwrap();
        assert_eq!(exact.items.len(), 2);
        assert!(!exact.has_more);
    }

    #[test]
    fn test_paginate_filters_and_sorts() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.upsert_entry(&entry("a", "Alpha", Some("Filmy"), 300.0)).unwrap();
        store.upsert_entry(&entry("b", "Beta", Some("Filmy"), 100.0)).unwrap();
        store.upsert_entry(&entry("c", "Gamma", Some("Hry"), 200.0)).unwrap();
        store.record_stats("a", 1, 50).unwrap();
        store.record_stats("b", 90, 5).unwrap();
        store.record_stats("c", 40, 7).unwrap();

        let by_size = store
            .paginate(&PageQuery {
                category: Some("Filmy".to_string()),
                sort: SortKey::SizeAsc,
                ..PageQuery::default()
            })
            .unwrap();
        let ids: Vec<_> = by_size.items.iter().map(|e| e.entry.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(by_size.total, 2);

        let by_seeds = store
            .paginate(&PageQuery {
                sort: SortKey::SeedsDesc,
                ..PageQuery::default()
            })
            .unwrap();
        let ids: Vec<_> = by_seeds.items.iter().map(|e| e.entry.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);

        let by_leeches = store
            .paginate(&PageQuery {
                sort: SortKey::LeechesDesc,
                ..PageQuery::default()
            })
            .unwrap();
        assert_eq!(by_leeches.items[0].entry.id, "a");

        let searched = store
            .paginate(&PageQuery {
                search: Some("amm".to_string()),
                ..PageQuery::default()
            })
            .unwrap();
        assert_eq!(searched.total, 1);
        assert_eq!(searched.items[0].entry.id, "c");
    }

    #[test]
    fn test_paginate_defaults_for_bad_window() {
        let store = SqliteStore::new_in_memory().unwrap();
        for i in 0..25 {
            store
                .upsert_entry(&entry(&format!("d{:02}", i), "Item", None, 1.0))
                .unwrap();
        }

        let page = store
            .paginate(&PageQuery {
                offset: -5,
                limit: 0,
                ..PageQuery::default()
            })
            .unwrap();
        assert_eq!(page.items.len(), DEFAULT_PAGE_SIZE as usize);
        assert!(page.has_more);
        assert_eq!(page.total, 25);
    }

    #[test]
    fn test_paginate_with_maximum_limit() {
        let store = SqliteStore::new_in_memory().unwrap();
        for i in 0..3 {
            store
                .upsert_entry(&entry(&format!("m{}", i), "Item", None, 1.0))
                .unwrap();
        }

        let page = store
            .paginate(&PageQuery {
                limit: i64::MAX,
                ..PageQuery::default()
            })
            .unwrap();
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.total, 3);
        assert!(!page.has_more);
    }

    #[test]
    fn test_aggregate_stats() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.upsert_entry(&entry("a", "A", Some("Filmy"), 1.0)).unwrap();
        store.upsert_entry(&entry("b", "B", Some("Filmy"), 1.0)).unwrap();
        store.upsert_entry(&entry("c", "C", None, 1.0)).unwrap();
        store.record_stats("a", 1, 1).unwrap();
        tick();
        store.record_stats("a", 2, 2).unwrap();

        let stats = store.aggregate_stats().unwrap();
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.total_samples, 2);
        assert_eq!(
            stats.by_category[0],
            CategoryCount {
                category: Some("Filmy".to_string()),
                count: 2
            }
        );
        assert!(stats
            .by_category
            .contains(&CategoryCount { category: None, count: 1 }));
    }

    #[test]
    fn test_full_text_search() {
        let store = SqliteStore::new_in_memory().unwrap();
        store
            .upsert_entry(&entry("1", "Interstellar 2014", Some("Filmy"), 1.0))
            .unwrap();
        store
            .upsert_entry(&entry("2", "Inception", Some("Filmy"), 1.0))
            .unwrap();

        let hits = store.full_text_search("inter", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.id, "1");

        // FTS follows renames through the update trigger
        store
            .upsert_entry(&entry("2", "Interview", Some("Filmy"), 1.0))
            .unwrap();
        assert_eq!(store.full_text_search("inter", 10).unwrap().len(), 2);
        assert!(store.full_text_search("inception", 10).unwrap().is_empty());

        assert!(store.full_text_search("   ", 10).unwrap().is_empty());
        assert!(store.full_text_search("\"unbalanced", 10).is_ok());
    }

    #[test]
    fn test_by_rating_link() {
        let store = SqliteStore::new_in_memory().unwrap();
        let mut rated = entry("r", "Rated", None, 1.0);
        rated.rating = 70;
        rated.rating_url = "https://www.csfd.cz/film/4242-rated/".to_string();
        store.upsert_entry(&rated).unwrap();
        store.upsert_entry(&entry("u", "Unrated", None, 1.0)).unwrap();

        let found = store.by_rating_link("4242", 0).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].entry.id, "r");
    }

    #[test]
    fn test_fts_match_expression() {
        assert_eq!(fts_match_expression("dune part"), Some("\"dune\"* \"part\"*".to_string()));
        assert_eq!(fts_match_expression("a\"b"), Some("\"a\"\"b\"*".to_string()));
        assert_eq!(fts_match_expression("  "), None);
    }

    #[test]
    fn test_store_is_shareable_across_threads() {
        use std::sync::Arc;

        let store = Arc::new(SqliteStore::new_in_memory().unwrap());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    // Every thread writes the same identifier
                    store
                        .upsert_entry(&entry("shared", &format!("Writer {}", i), None, 1.0))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.aggregate_stats().unwrap().total_entries, 1);
    }

    #[test]
    fn test_on_disk_store_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.db");

        {
            let store = SqliteStore::new(&path).unwrap();
            store.upsert_entry(&entry("keep", "Kept", None, 5.0)).unwrap();
            store.record_stats("keep", 4, 1).unwrap();
        }

        let store = SqliteStore::new(&path).unwrap();
        let loaded = store.current_stats_for("keep").unwrap().unwrap();
        assert_eq!(loaded.entry.name, "Kept");
        assert_eq!(loaded.seeds, 4);
    }
}
