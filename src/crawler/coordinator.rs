//! Crawler coordinator - main crawl orchestration logic
//!
//! This module wires the pieces of a run together:
//! - Validating configuration and opening the store
//! - Building the shared fetcher, extractor and enricher
//! - Fanning pages out to the scheduler
//! - Persisting collected listings in ascending page order

use crate::config::{validate, Config};
use crate::crawler::enricher::DetailEnricher;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::{CatalogExtractor, RawListing, RecordExtractor};
use crate::crawler::scheduler::{PageOutcome, PageRange, Scheduler};
use crate::storage::{open_store, ListingStore};
use crate::{ConfigError, HarvestError};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Summary of one crawl run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlReport {
    /// Number of pages in the requested range
    pub pages: usize,
    /// Listings extracted across all successful pages
    pub records_seen: usize,
    /// Listings whose entry and stats sample were both stored
    pub records_persisted: usize,
    /// Executors used for the run
    pub workers: u32,
    /// Failed pages with their error message, in ascending page order
    pub page_errors: Vec<(u32, String)>,
    pub elapsed: Duration,
}

impl CrawlReport {
    pub fn pages_failed(&self) -> usize {
        self.page_errors.len()
    }

    pub fn pages_succeeded(&self) -> usize {
        self.pages.saturating_sub(self.page_errors.len())
    }
}

/// Everything a worker needs to process one page
struct PagePipeline {
    config: Config,
    fetcher: PageFetcher,
    extractor: Arc<dyn RecordExtractor>,
    enricher: DetailEnricher,
}

impl PagePipeline {
    /// Fetch, extract and enrich one catalog page
    async fn crawl_page(&self, page: u32) -> Result<Vec<RawListing>, HarvestError> {
        let url = self.config.source.page_url(page).map_err(|e| {
            ConfigError::InvalidUrl(format!("Cannot build URL for page {}: {}", page, e))
        })?;

        let html = self.fetcher.fetch(url.as_str()).await?;

        let mut listings = self.extractor.extract(&html).map_err(|e| match e {
            HarvestError::Parse { message, .. } => HarvestError::Parse {
                url: url.to_string(),
                message,
            },
            other => other,
        })?;

        self.enricher.enrich_all(&mut listings).await;

        tracing::info!("Page {}: {} listings", page, listings.len());
        Ok(listings)
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    pipeline: Arc<PagePipeline>,
    store: Arc<dyn ListingStore>,
}

impl Coordinator {
    /// Creates a coordinator, opening the store named by the configuration
    ///
    /// The configuration is validated first, so an invalid configuration fails
    /// before any file or network activity.
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        validate(&config)?;
        let store = open_store(Path::new(&config.output.database_path))?;
        Self::with_store(config, Arc::new(store))
    }

    /// Creates a coordinator over an existing store
    pub fn with_store(config: Config, store: Arc<dyn ListingStore>) -> Result<Self, HarvestError> {
        validate(&config)?;

        let fetcher = PageFetcher::from_config(&config.source, &config.crawler)?;
        let extractor = CatalogExtractor::from_config(&config)?;
        let enricher = DetailEnricher::new(fetcher.clone());

        Ok(Self {
            pipeline: Arc::new(PagePipeline {
                config,
                fetcher,
                extractor: Arc::new(extractor),
                enricher,
            }),
            store,
        })
    }

    /// Replaces the record extractor
    pub fn with_extractor(self, extractor: Arc<dyn RecordExtractor>) -> Self {
        let pipeline = PagePipeline {
            config: self.pipeline.config.clone(),
            fetcher: self.pipeline.fetcher.clone(),
            extractor,
            enricher: self.pipeline.enricher.clone(),
        };
        Self {
            pipeline: Arc::new(pipeline),
            store: self.store,
        }
    }

    pub fn config(&self) -> &Config {
        &self.pipeline.config
    }

    pub fn store(&self) -> Arc<dyn ListingStore> {
        Arc::clone(&self.store)
    }

    /// Fetches, extracts and enriches one page without persisting it
    pub async fn crawl_page(&self, page: u32) -> Result<Vec<RawListing>, HarvestError> {
        self.pipeline.crawl_page(page).await
    }

    /// Crawls every page in `range` with `workers` executors
    ///
    /// Page failures are collected into the report; only an inverted range or
    /// an invalid worker count fails the run, before any request is made.
    pub async fn run(&self, range: PageRange, workers: u32) -> Result<CrawlReport, HarvestError> {
        range.validate()?;
        let scheduler = Scheduler::new(workers)?;
        let start_time = Instant::now();

        tracing::info!(
            "Starting crawl of pages {}..={} with {} workers",
            range.from(),
            range.to(),
            workers
        );

        let pipeline = Arc::clone(&self.pipeline);
        let outcomes = scheduler
            .dispatch(range, move |page| {
                let pipeline = Arc::clone(&pipeline);
                async move { pipeline.crawl_page(page).await }
            })
            .await;

        let mut report = CrawlReport {
            pages: range.len(),
            workers,
            ..CrawlReport::default()
        };

        for PageOutcome { page, result } in outcomes {
            match result {
                Ok(listings) => self.persist_page(page, &listings, &mut report),
                Err(e) => {
                    if !e.is_page_level() {
                        tracing::error!("Page {} hit a non-page error: {}", page, e);
                    }
                    report.page_errors.push((page, e.to_string()));
                }
            }
        }

        report.elapsed = start_time.elapsed();
        tracing::info!(
            "Crawl completed: {} seen, {} saved, {} failed pages in {:?}",
            report.records_seen,
            report.records_persisted,
            report.pages_failed(),
            report.elapsed
        );

        Ok(report)
    }

    /// Stores one page's listings; a failing record never stops the run
    fn persist_page(&self, page: u32, listings: &[RawListing], report: &mut CrawlReport) {
        for listing in listings {
            report.records_seen += 1;

            if let Err(e) = self.store.upsert_entry(&listing.to_entry()) {
                tracing::warn!("Page {}: failed to save {}: {}", page, listing.id, e);
                continue;
            }

            if let Err(e) = self
                .store
                .record_stats(&listing.id, listing.seeds, listing.leeches)
            {
                tracing::warn!("Page {}: failed to record stats for {}: {}", page, listing.id, e);
                continue;
            }

            report.records_persisted += 1;
        }
    }
}

/// Runs a complete crawl with the configured worker count
///
/// # Example
///
/// ```no_run
/// use listing_harvester::config::load_config;
/// use listing_harvester::crawler::{run_crawl, PageRange};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvester.toml"))?;
/// let report = run_crawl(config, PageRange::new(0, 4)?).await?;
/// println!("{} saved", report.records_persisted);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, range: PageRange) -> Result<CrawlReport, HarvestError> {
    let workers = config.crawler.workers;
    let coordinator = Coordinator::new(config)?;
    coordinator.run(range, workers).await
}
