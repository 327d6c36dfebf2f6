//! Catalog statistics and listing tables
//!
//! This module renders read-side store results for the terminal.

use crate::storage::{CatalogStats, EntryWithStats, StatsSample};
use std::fmt::Write;

/// Formats aggregate store statistics
pub fn format_catalog_stats(stats: &CatalogStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Catalog Statistics ===\n");
    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Total entries: {}", stats.total_entries);
    let _ = writeln!(out, "  Stats samples: {}", stats.total_samples);

    if !stats.by_category.is_empty() {
        let _ = writeln!(out, "\nEntries by Category:");
        for category in &stats.by_category {
            let percentage = if stats.total_entries > 0 {
                (category.count as f64 / stats.total_entries as f64) * 100.0
            } else {
                0.0
            };
            let _ = writeln!(
                out,
                "  {}: {} ({:.1}%)",
                category.category.as_deref().unwrap_or("(uncategorized)"),
                category.count,
                percentage
            );
        }
    }

    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_catalog_stats(stats: &CatalogStats) {
    print!("{}", format_catalog_stats(stats));
}

/// Formats one line per entry: name, size, current seeds/leeches, rating
pub fn format_entries(entries: &[EntryWithStats]) -> String {
    if entries.is_empty() {
        return "No entries.\n".to_string();
    }

    let mut out = String::new();
    for item in entries {
        let entry = &item.entry;
        let _ = write!(
            out,
            "{}  [{}]  {:.1} MB  S:{} L:{}",
            entry.name,
            entry.category.as_deref().unwrap_or("-"),
            entry.size_mb,
            item.seeds,
            item.leeches
        );
        if entry.rating > 0 {
            let _ = write!(out, "  CSFD {}%", entry.rating);
        }
        if let Some(added) = entry.added_date {
            let _ = write!(out, "  added {}", added.format("%Y-%m-%d"));
        }
        out.push('\n');
    }
    out
}

pub fn print_entries(entries: &[EntryWithStats]) {
    print!("{}", format_entries(entries));
}

/// Formats one line per stats sample, in the order given
pub fn format_stats_history(samples: &[StatsSample]) -> String {
    if samples.is_empty() {
        return "No samples.\n".to_string();
    }

    let mut out = String::new();
    for sample in samples {
        let _ = writeln!(
            out,
            "  {}  S:{} L:{}",
            sample.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            sample.seeds,
            sample.leeches
        );
    }
    out
}

pub fn print_stats_history(samples: &[StatsSample]) {
    print!("{}", format_stats_history(samples));
}
