//! HTML extraction of catalog listings
//!
//! This module turns one catalog page into raw listing records:
//! - Locates listing cells and their detail links
//! - Reads title, identifier, category and poster image
//! - Scans the metadata block for size, added date, seeds and leeches

use crate::config::{Config, DateFallback};
use crate::crawler::normalize::{
    parse_counter, parse_rating, parse_size, resolve_added_date,
};
use crate::storage::Entry;
use crate::{ConfigError, HarvestError};
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;
use url::Url;

static LISTING_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.lista").expect("listing cell selector is valid"));

static DETAIL_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a[href*='details.php']").expect("detail link selector is valid")
});

static CATEGORY_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a[href*='torrents_v2.php?category=']").expect("category selector is valid")
});

static POSTER_IMAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img.lozad").expect("poster selector is valid"));

/// Marker that identifies a cell's metadata block
const METADATA_MARKER: &str = "Velkost";
const SIZE_PREFIX: &str = "Velkost";
const DATE_PREFIX: &str = "Pridany";
const SEEDS_PREFIX: &str = "Odosielaju";
const LEECHES_PREFIX: &str = "Stahuju";

/// One listing as scraped from a catalog page
#[derive(Debug, Clone, PartialEq)]
pub struct RawListing {
    /// The `id` query parameter of the item's detail link
    pub id: String,
    pub title: String,
    pub category: Option<String>,
    /// Size text as it appeared on the page, e.g. `6.9 GB`
    pub size_text: String,
    pub size_mb: f64,
    /// Date text as it appeared on the page, e.g. `02/07/2025`
    pub date_text: String,
    pub added_date: Option<DateTime<Utc>>,
    pub seeds: u32,
    pub leeches: u32,
    /// Absolute URL of the item's detail page
    pub detail_url: String,
    pub image_url: Option<String>,
    /// Rating parsed from the title; 0 means unrated
    pub rating: u32,
    /// Outbound rating link, filled in by enrichment
    pub rating_url: String,
}

impl RawListing {
    /// Converts the listing into a storable entry
    ///
    /// The store owns `created_at`/`updated_at`; the values set here are
    /// placeholders.
    pub fn to_entry(&self) -> Entry {
        let now = Utc::now();
        Entry {
            id: self.id.clone(),
            name: self.title.clone(),
            category: self.category.clone(),
            size_mb: self.size_mb,
            added_date: self.added_date,
            url: self.detail_url.clone(),
            image_url: self.image_url.clone(),
            rating: self.rating,
            rating_url: self.rating_url.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Turns one fetched document into raw listing records
pub trait RecordExtractor: Send + Sync {
    fn extract(&self, html: &str) -> Result<Vec<RawListing>, HarvestError>;
}

/// Extractor for the catalog's listing table markup
#[derive(Debug, Clone)]
pub struct CatalogExtractor {
    site_url: Url,
    date_fallback: DateFallback,
}

impl CatalogExtractor {
    /// Creates an extractor resolving item links against `site_url`
    pub fn new(site_url: &str, date_fallback: DateFallback) -> Result<Self, ConfigError> {
        let site_url = Url::parse(site_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid site-url '{}': {}", site_url, e)))?;
        Ok(Self {
            site_url,
            date_fallback,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::new(&config.source.site_url, config.crawler.unparsed_date)
    }

    /// Extracts one listing from a cell, or `None` if the cell does not qualify
    fn extract_cell(&self, cell: ElementRef<'_>) -> Option<RawListing> {
        let (link, title) = cell.select(&DETAIL_LINK).find_map(|link| {
            let title = collapse_text(link);
            (!title.is_empty()).then_some((link, title))
        })?;

        let href = link.value().attr("href")?;
        let detail_url = match self.site_url.join(href) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Skipping cell with unresolvable link {}: {}", href, e);
                return None;
            }
        };

        let id = detail_url
            .query_pairs()
            .find(|(key, _)| key == "id")
            .map(|(_, value)| value.trim().to_string())
            .filter(|id| !id.is_empty());
        let Some(id) = id else {
            tracing::debug!("Skipping cell without item id: {}", href);
            return None;
        };

        let category = cell
            .select(&CATEGORY_LINK)
            .next()
            .map(collapse_text)
            .filter(|c| !c.is_empty());

        let image_url = cell
            .select(&POSTER_IMAGE)
            .next()
            .and_then(|img| img.value().attr("data-src"))
            .map(|src| src.trim().to_string())
            .filter(|src| !src.is_empty());

        let mut listing = RawListing {
            id,
            rating: parse_rating(&title),
            title,
            category,
            size_text: String::new(),
            size_mb: 0.0,
            date_text: String::new(),
            added_date: None,
            seeds: 0,
            leeches: 0,
            detail_url: detail_url.to_string(),
            image_url,
            rating_url: String::new(),
        };

        self.apply_metadata(cell, &mut listing);
        Some(listing)
    }

    /// Scans the metadata block once; the first line for each prefix wins
    fn apply_metadata(&self, cell: ElementRef<'_>, listing: &mut RawListing) {
        let block = block_text(cell);
        if !block.contains(METADATA_MARKER) {
            listing.added_date = resolve_added_date("", self.date_fallback);
            return;
        }

        let mut size_seen = false;
        let mut seeds_seen = false;
        let mut leeches_seen = false;

        for line in block.lines().map(str::trim) {
            if let Some(rest) = line.strip_prefix(SIZE_PREFIX) {
                if size_seen {
                    continue;
                }
                size_seen = true;

                let mut parts = rest.splitn(2, '|');
                let size_part = parts.next().unwrap_or_default();
                let date_part = parts.next().unwrap_or_default();

                listing.size_text = size_part.trim().trim_start_matches(':').trim().to_string();
                listing.size_mb = parse_size(&listing.size_text);

                let date_part = date_part.trim();
                listing.date_text = date_part
                    .strip_prefix(DATE_PREFIX)
                    .unwrap_or(date_part)
                    .trim()
                    .trim_start_matches(':')
                    .trim()
                    .to_string();
            } else if let Some(rest) = line.strip_prefix(SEEDS_PREFIX) {
                if !seeds_seen {
                    seeds_seen = true;
                    listing.seeds = parse_counter(rest);
                }
            } else if let Some(rest) = line.strip_prefix(LEECHES_PREFIX) {
                if !leeches_seen {
                    leeches_seen = true;
                    listing.leeches = parse_counter(rest);
                }
            }
        }

        listing.added_date = resolve_added_date(&listing.date_text, self.date_fallback);
    }
}

impl RecordExtractor for CatalogExtractor {
    fn extract(&self, html: &str) -> Result<Vec<RawListing>, HarvestError> {
        if html.trim().is_empty() {
            return Err(HarvestError::Parse {
                url: self.site_url.to_string(),
                message: "empty document".to_string(),
            });
        }

        let document = Html::parse_document(html);
        let listings = document
            .select(&LISTING_CELL)
            .filter_map(|cell| self.extract_cell(cell))
            .collect();

        Ok(listings)
    }
}

/// Returns the first non-empty `href` matched by the highest-priority selector
///
/// Selectors are tried in order; a selector whose matches all carry an empty
/// `href` falls through to the next one.
pub fn first_link_href(html: &str, selectors: &[Selector]) -> Option<String> {
    let document = Html::parse_document(html);
    selectors.iter().find_map(|selector| {
        document
            .select(selector)
            .filter_map(|link| link.value().attr("href"))
            .map(str::trim)
            .find(|href| !href.is_empty())
            .map(str::to_string)
    })
}

/// Element text with whitespace runs collapsed to single spaces
fn collapse_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cell text with `<br>` elements rendered as line breaks
fn block_text(cell: ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in cell.descendants() {
        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(e) if e.name() == "br" => text.push('\n'),
            _ => {}
        }
    }
    text
}
