use serde::Deserialize;
use url::Url;

/// Main configuration structure for Listing-Harvester
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Catalog source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Catalog listing URL; the page number is set as its `page` query parameter
    #[serde(rename = "catalog-url", default = "default_catalog_url")]
    pub catalog_url: String,

    /// Base URL that relative item links are resolved against
    #[serde(rename = "site-url", default = "default_site_url")]
    pub site_url: String,

    /// Identifying User-Agent sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            catalog_url: default_catalog_url(),
            site_url: default_site_url(),
            user_agent: default_user_agent(),
        }
    }
}

impl SourceConfig {
    /// Builds the catalog URL for one page number
    ///
    /// Any `page` parameter already present in the configured URL is replaced.
    pub fn page_url(&self, page: u32) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.catalog_url)?;
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != "page")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair("page", &page.to_string());

        Ok(url)
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent page workers (1..=20)
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Overall per-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connect timeout in seconds
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// What to store when an added-date cannot be parsed
    #[serde(rename = "unparsed-date", default)]
    pub unparsed_date: DateFallback,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            unparsed_date: DateFallback::default(),
        }
    }
}

/// Policy for added-dates that match none of the known layouts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFallback {
    /// Substitute the current time
    #[default]
    Now,
    /// Leave the date unset
    Absent,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_catalog_url() -> String {
    "https://sktorrent.eu/torrent/torrents_v2.php?active=0&order=data&by=DESC&zaner=&jazyk=".to_string()
}

fn default_site_url() -> String {
    "https://sktorrent.eu/torrent/".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; SkTorrent-Crawler/1.0)".to_string()
}

fn default_workers() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_database_path() -> String {
    "torrents.db".to_string()
}
