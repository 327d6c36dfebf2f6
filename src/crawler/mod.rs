//! Crawler module for catalog harvesting
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching of catalog and detail pages
//! - Listing extraction and field normalization
//! - Rating link enrichment
//! - Bounded-parallel page scheduling
//! - Overall run coordination

mod coordinator;
mod enricher;
mod fetcher;
pub mod normalize;
mod parser;
mod scheduler;

pub use coordinator::{run_crawl, Coordinator, CrawlReport};
pub use enricher::{find_rating_link, DetailEnricher};
pub use fetcher::{build_http_client, PageFetcher};
pub use parser::{CatalogExtractor, RawListing, RecordExtractor};
pub use scheduler::{PageOutcome, PageRange, Scheduler};
