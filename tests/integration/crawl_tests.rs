//! Integration tests for the harvester
//!
//! These tests use wiremock to create mock catalog servers and test
//! the full fetch, extract, enrich and persist cycle end-to-end.

use listing_harvester::config::{Config, CrawlerConfig, DateFallback, OutputConfig, SourceConfig};
use listing_harvester::crawler::{Coordinator, PageRange, RawListing, RecordExtractor};
use listing_harvester::storage::{ListingStore, PageQuery};
use listing_harvester::HarvestError;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CATALOG_PATH: &str = "/torrent/torrents_v2.php";
const DETAIL_PATH: &str = "/torrent/details.php";

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, db_path: &str, workers: u32) -> Config {
    Config {
        source: SourceConfig {
            catalog_url: format!("{}{}?active=0", base_url, CATALOG_PATH),
            site_url: format!("{}/torrent/", base_url),
            user_agent: "TestHarvester/1.0".to_string(),
        },
        crawler: CrawlerConfig {
            workers,
            timeout_secs: 5,
            connect_timeout_secs: 2,
            unparsed_date: DateFallback::Absent,
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
        },
    }
}

fn db_path(dir: &TempDir) -> String {
    dir.path().join("harvest.db").to_string_lossy().to_string()
}

/// One listing cell in the catalog's markup
fn cell(id: &str, title: &str, seeds: u32, leeches: u32) -> String {
    format!(
        r#"<td class="lista">
            <a href="torrents_v2.php?category=1">Filmy CZ/SK dabing</a><br>
            <a href="details.php?name=x&amp;id={id}"><img class="lozad" data-src="/posters/{id}.jpg"></a><br>
            <a href="details.php?name=x&amp;id={id}">{title}</a><br>
            Velkost 1.5 GB | Pridany 02/07/2025<br>
            Odosielaju : {seeds}<br>
            Stahuju : {leeches}<br>
        </td>"#
    )
}

fn catalog_page(cells: &[String]) -> String {
    format!(
        "<html><body><table class=\"lista\"><tr>{}</tr></table></body></html>",
        cells.join("\n")
    )
}

async fn mount_catalog_page(server: &MockServer, page: u32, body: String) {
    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_crawl_page_zero_persists_qualifying_cells() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let body = catalog_page(&[
        cell("aaa111", "Film X = CSFD 77%", 14, 3),
        r#"<td class="lista">Velkost 9 GB | Pridany 01/01/2024</td>"#.to_string(),
        cell("bbb222", "Film Y", 2, 0),
    ]);
    mount_catalog_page(&mock_server, 0, body).await;

    // Only the rated listing is enriched
    Mock::given(method("GET"))
        .and(path(DETAIL_PATH))
        .and(query_param("id", "aaa111"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><a itemprop="sameAs" href="https://www.csfd.cz/film/77-film-x/">CSFD</a></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(DETAIL_PATH))
        .and(query_param("id", "bbb222"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &db_path(&dir), 1);
    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let report = coordinator
        .run(PageRange::single(0), 1)
        .await
        .expect("Crawl failed");

    assert_eq!(report.pages, 1);
    assert_eq!(report.records_seen, 2);
    assert_eq!(report.records_persisted, 2);
    assert_eq!(report.workers, 1);
    assert!(report.page_errors.is_empty());

    let store = coordinator.store();
    let stats = store.aggregate_stats().unwrap();
    assert_eq!(stats.total_entries, 2);
    assert_eq!(stats.total_samples, 2);

    let rated = store.current_stats_for("aaa111").unwrap().unwrap();
    assert_eq!(rated.entry.name, "Film X = CSFD 77%");
    assert_eq!(rated.entry.rating, 77);
    assert_eq!(rated.entry.rating_url, "https://www.csfd.cz/film/77-film-x/");
    assert_eq!(rated.entry.category.as_deref(), Some("Filmy CZ/SK dabing"));
    assert!((rated.entry.size_mb - 1536.0).abs() < 1e-9);
    assert_eq!(rated.seeds, 14);
    assert_eq!(rated.leeches, 3);
    assert_eq!(rated.entry.image_url.as_deref(), Some("/posters/aaa111.jpg"));

    let unrated = store.current_stats_for("bbb222").unwrap().unwrap();
    assert_eq!(unrated.entry.rating, 0);
    assert_eq!(unrated.entry.rating_url, "");
    assert_eq!(
        unrated.entry.url,
        format!("{}{}?name=x&id=bbb222", mock_server.uri(), DETAIL_PATH)
    );
}

#[tokio::test]
async fn test_repeat_crawl_appends_stats_history() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), &db_path(&dir), 1);
    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");

    mount_catalog_page(&mock_server, 0, catalog_page(&[cell("ccc333", "Film Z", 10, 1)])).await;
    coordinator.run(PageRange::single(0), 1).await.unwrap();

    let first = coordinator.store().current_stats_for("ccc333").unwrap().unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    mock_server.reset().await;
    mount_catalog_page(&mock_server, 0, catalog_page(&[cell("ccc333", "Film Z", 15, 4)])).await;
    coordinator.run(PageRange::single(0), 1).await.unwrap();

    let store = coordinator.store();
    let stats = store.aggregate_stats().unwrap();
    assert_eq!(stats.total_entries, 1);
    assert_eq!(stats.total_samples, 2);

    let history = store.stats_history("ccc333", 0).unwrap();
    let seeds: Vec<u32> = history.iter().map(|s| s.seeds).collect();
    assert_eq!(seeds, vec![15, 10]);

    let second = store.current_stats_for("ccc333").unwrap().unwrap();
    assert_eq!(second.seeds, 15);
    assert_eq!(second.leeches, 4);
    assert_eq!(second.entry.created_at, first.entry.created_at);
    assert!(second.entry.updated_at > first.entry.updated_at);
}

#[tokio::test]
async fn test_failing_page_is_isolated() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_catalog_page(&mock_server, 1, catalog_page(&[cell("p1", "Page One", 1, 0)])).await;
    mount_catalog_page(&mock_server, 3, catalog_page(&[cell("p3", "Page Three", 3, 0)])).await;
    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &db_path(&dir), 3);
    let coordinator = Coordinator::new(config).unwrap();
    let report = coordinator
        .run(PageRange::new(1, 3).unwrap(), 3)
        .await
        .unwrap();

    assert_eq!(report.pages, 3);
    assert_eq!(report.records_seen, 2);
    assert_eq!(report.records_persisted, 2);
    assert_eq!(report.page_errors.len(), 1);
    assert_eq!(report.page_errors[0].0, 2);
    assert!(report.page_errors[0].1.contains("500"));

    let store = coordinator.store();
    assert!(store.current_stats_for("p1").unwrap().is_some());
    assert!(store.current_stats_for("p3").unwrap().is_some());
}

#[tokio::test]
async fn test_many_pages_many_workers() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    for page in 0..8u32 {
        let cells: Vec<String> = (0..3)
            .map(|i| cell(&format!("id-{}-{}", page, i), &format!("Item {} {}", page, i), i, 0))
            .collect();
        mount_catalog_page(&mock_server, page, catalog_page(&cells)).await;
    }

    let config = create_test_config(&mock_server.uri(), &db_path(&dir), 4);
    let coordinator = Coordinator::new(config).unwrap();
    let report = coordinator
        .run(PageRange::new(0, 7).unwrap(), 4)
        .await
        .unwrap();

    assert_eq!(report.records_seen, 24);
    assert_eq!(report.records_persisted, 24);
    assert_eq!(report.workers, 4);

    let page = coordinator
        .store()
        .paginate(&PageQuery {
            limit: 10,
            ..PageQuery::default()
        })
        .unwrap();
    assert_eq!(page.total, 24);
    assert_eq!(page.items.len(), 10);
    assert!(page.has_more);
}

#[tokio::test]
async fn test_invalid_config_fails_before_network() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &db_path(&dir), 0);
    assert!(matches!(
        Coordinator::new(config),
        Err(HarvestError::Config(_))
    ));

    let config = create_test_config(&mock_server.uri(), &db_path(&dir), 2);
    let coordinator = Coordinator::new(config).unwrap();
    assert!(coordinator.run(PageRange::single(0), 25).await.is_err());
    assert!(PageRange::new(5, 4).is_err());
}

struct StaticExtractor;

impl RecordExtractor for StaticExtractor {
    fn extract(&self, _html: &str) -> Result<Vec<RawListing>, HarvestError> {
        Ok(vec![RawListing {
            id: "static".to_string(),
            title: "From a custom extractor".to_string(),
            category: None,
            size_text: String::new(),
            size_mb: 0.0,
            date_text: String::new(),
            added_date: None,
            seeds: 7,
            leeches: 7,
            detail_url: "https://catalog.example.com/details.php?id=static".to_string(),
            image_url: None,
            rating: 0,
            rating_url: String::new(),
        }])
    }
}

#[tokio::test]
async fn test_custom_extractor_is_used() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_catalog_page(&mock_server, 0, "<html>anything</html>".to_string()).await;

    let config = create_test_config(&mock_server.uri(), &db_path(&dir), 1);
    let coordinator = Coordinator::new(config)
        .unwrap()
        .with_extractor(Arc::new(StaticExtractor));
    let report = coordinator.run(PageRange::single(0), 1).await.unwrap();

    assert_eq!(report.records_persisted, 1);
    let stored = coordinator.store().current_stats_for("static").unwrap().unwrap();
    assert_eq!(stored.entry.name, "From a custom extractor");
    assert_eq!(stored.seeds, 7);
}
