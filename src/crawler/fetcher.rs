//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester:
//! - Building the shared HTTP client with user agent and timeouts
//! - GET requests for catalog and detail pages
//! - Error classification into transport and status failures

use crate::config::{CrawlerConfig, SourceConfig};
use crate::HarvestError;
use reqwest::Client;
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use listing_harvester::config::Config;
/// use listing_harvester::crawler::build_http_client;
///
/// let config = Config::default();
/// let client = build_http_client(&config.source, &config.crawler).unwrap();
/// ```
pub fn build_http_client(
    source: &SourceConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(source.user_agent.clone())
        .timeout(Duration::from_secs(crawler.timeout_secs))
        .connect_timeout(Duration::from_secs(crawler.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches documents over a shared client
///
/// Cloning is cheap; every clone shares the client's connection pool.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(source: &SourceConfig, crawler: &CrawlerConfig) -> Result<Self, HarvestError> {
        Ok(Self::new(build_http_client(source, crawler)?))
    }

    /// Fetches a URL and returns its body as text
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | Connect failure, timeout, body read failure | `Transport` |
    /// | Non-2xx status | `HttpStatus` |
    /// | 2xx status | body text |
    pub async fn fetch(&self, url: &str) -> Result<String, HarvestError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| HarvestError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| HarvestError::Transport {
            url: url.to_string(),
            source,
        })
    }
}
