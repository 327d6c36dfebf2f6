//! Output module for crawl reports and store summaries
//!
//! This module handles:
//! - Rendering the end-of-run crawl report
//! - Rendering aggregate catalog statistics
//! - Rendering listing tables with current stats
//! - Rendering one entry's seeds/leeches history

pub mod stats;

pub use stats::{
    format_catalog_stats, format_entries, format_stats_history, print_catalog_stats,
    print_entries, print_stats_history,
};

use crate::crawler::CrawlReport;
use std::fmt::Write;

/// Formats the end-of-run totals and any failed pages
pub fn format_crawl_report(report: &CrawlReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Crawl Report ===\n");
    let _ = writeln!(out, "  Pages: {} ({} failed)", report.pages, report.pages_failed());
    let _ = writeln!(out, "  Total seen: {}", report.records_seen);
    let _ = writeln!(out, "  Saved: {}", report.records_persisted);
    let _ = writeln!(out, "  Workers used: {}", report.workers);
    let _ = writeln!(out, "  Elapsed: {:.1}s", report.elapsed.as_secs_f64());

    if !report.page_errors.is_empty() {
        let _ = writeln!(out, "\nFailed Pages:");
        for (page, error) in &report.page_errors {
            let _ = writeln!(out, "  - page {}: {}", page, error);
        }
    }

    out
}

pub fn print_crawl_report(report: &CrawlReport) {
    print!("{}", format_crawl_report(report));
}
