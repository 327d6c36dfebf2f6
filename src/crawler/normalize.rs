//! Field normalization for catalog text
//!
//! Every function here is total: malformed input degrades to 0 or no date
//! instead of failing.

use crate::config::DateFallback;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use std::sync::LazyLock;

static SIZE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9]+(?:[.,][0-9]+)?)\s*(KB|MB|GB|TB)\b").expect("size pattern is valid")
});

static RATING_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=\s*CSFD\s*(\d+)%").expect("rating pattern is valid"));

/// Day/month/year layouts, tried in order
const DATE_LAYOUTS: &[&str] = &["%d/%m/%Y", "%-d/%-m/%Y", "%d/%-m/%Y", "%-d/%m/%Y"];

/// Converts a quantity in the given unit to megabytes (binary multiples)
///
/// Unknown units and unparsable quantities yield 0.
pub fn size_to_mb(quantity: &str, unit: &str) -> f64 {
    let Ok(value) = quantity.trim().replace(',', ".").parse::<f64>() else {
        return 0.0;
    };
    if !value.is_finite() || value < 0.0 {
        return 0.0;
    }

    match unit.trim().to_ascii_uppercase().as_str() {
        "KB" => value / 1024.0,
        "MB" => value,
        "GB" => value * 1024.0,
        "TB" => value * 1024.0 * 1024.0,
        _ => 0.0,
    }
}

/// Finds a `<number> <unit>` pair anywhere in `text` and converts it to MB
///
/// # Example
///
/// ```
/// use listing_harvester::crawler::normalize::parse_size;
///
/// assert!((parse_size("6.9 GB") - 7065.6).abs() < 1e-9);
/// assert_eq!(parse_size("unknown"), 0.0);
/// ```
pub fn parse_size(text: &str) -> f64 {
    SIZE_PATTERN
        .captures(text)
        .map(|caps| size_to_mb(&caps[1], &caps[2]))
        .unwrap_or(0.0)
}

/// Parses a day/month/year date, accepting padded and unpadded fields
///
/// Returns `None` when no layout matches.
pub fn parse_added_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    DATE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDate::parse_from_str(text, layout).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parses a date and applies the configured fallback when nothing matches
pub fn resolve_added_date(text: &str, fallback: DateFallback) -> Option<DateTime<Utc>> {
    match parse_added_date(text) {
        Some(date) => Some(date),
        None => match fallback {
            DateFallback::Now => Some(Utc::now()),
            DateFallback::Absent => None,
        },
    }
}

/// Extracts the `= CSFD <n>%` rating from a title, or 0 when absent
pub fn parse_rating(title: &str) -> u32 {
    RATING_PATTERN
        .captures(title)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

/// Reads the leading integer of a counter value such as `: 14`
pub fn parse_counter(text: &str) -> u32 {
    let text = text.trim_start().trim_start_matches(':').trim_start();
    let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}
