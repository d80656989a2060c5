//! Integration tests for the harvest pipeline
//!
//! These tests use wiremock to stand in for the catalog's HTTP endpoints
//! and a stub detail source in place of the browser, exercising the
//! listing crawl, enrichment batching, and export paths end-to-end.

use async_trait::async_trait;
use shelfrank::config::Config;
use shelfrank::crawler::CrawlOrchestrator;
use shelfrank::detail::DetailSource;
use shelfrank::output::{export_all, CSV_COLUMNS};
use shelfrank::records::{DetailInfo, ListingRecord};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointed at the mock server
fn create_test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.listing.base_url = base_url.to_string();
    config.fetcher.rate_limit_ms = 10;
    config.fetcher.backoff_base_ms = 10;
    config.detail.item_pause_ms = 0;
    config
}

fn orchestrator(config: Config) -> CrawlOrchestrator {
    CrawlOrchestrator::new(Arc::new(config), Arc::new(AtomicBool::new(false)))
        .expect("Failed to create orchestrator")
}

/// One listing page with the given product names
fn listing_page(names: &[&str]) -> String {
    let items: String = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            format!(
                r#"<div class="prd_info">
                    <a href="/store/goods/getGoodsDetail.do?goodsNo=G{i}&tab=a"></a>
                    <p class="tx_name">{name}</p>
                    <span class="tx_brand">BrandCo</span>
                    <span class="tx_cur">{},900원</span>
                    <span class="rating">4.{i}</span>
                </div>"#,
                i + 1
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", items)
}

async fn mount_page(server: &MockServer, page: u32, body: String) {
    Mock::given(method("GET"))
        .and(path("/store/main/getBestList.do"))
        .and(query_param("pageIdx", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_crawl_concatenates_pages_until_empty() {
    let server = MockServer::start().await;

    mount_page(&server, 1, listing_page(&["alpha", "beta"])).await;
    mount_page(&server, 2, listing_page(&["gamma"])).await;
    mount_page(&server, 3, listing_page(&[])).await;

    let orchestrator = orchestrator(create_test_config(&server.uri()));
    let records = orchestrator.crawl(10).await;

    // Pages 1 and 2 in order, page 3 ended the listing
    assert_eq!(records.len(), 3);
    let names: Vec<_> = records.iter().filter_map(|r| r.name.as_deref()).collect();
    assert_eq!(names, vec!["alpha", "beta", "gamma"]);

    // Rank restarts with each page's containers
    assert_eq!(records[0].rank, 1);
    assert_eq!(records[1].rank, 2);
    assert_eq!(records[2].rank, 1);

    // Normalized fields came through
    assert_eq!(records[0].price, 1900);
    assert_eq!(records[0].rating, 4.0);
    assert_eq!(records[0].goods_no.as_deref(), Some("G0"));
}

#[tokio::test]
async fn test_crawl_stops_at_max_pages() {
    let server = MockServer::start().await;
    mount_page(&server, 1, listing_page(&["only"])).await;

    let orchestrator = orchestrator(create_test_config(&server.uri()));
    let records = orchestrator.crawl(1).await;

    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_unfetchable_page_ends_the_listing() {
    let server = MockServer::start().await;

    mount_page(&server, 1, listing_page(&["kept"])).await;
    Mock::given(method("GET"))
        .and(path("/store/main/getBestList.do"))
        .and(query_param("pageIdx", "2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let orchestrator = orchestrator(create_test_config(&server.uri()));
    let records = orchestrator.crawl(10).await;

    // The failed page ends the crawl; page 1 survives
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name.as_deref(), Some("kept"));
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;

    // First hit fails with a retryable status, the retry succeeds
    Mock::given(method("GET"))
        .and(path("/store/main/getBestList.do"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, 1, listing_page(&["recovered"])).await;

    let orchestrator = orchestrator(create_test_config(&server.uri()));
    let records = orchestrator.crawl(1).await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name.as_deref(), Some("recovered"));
}

#[tokio::test]
async fn test_requests_are_spaced_by_the_rate_limit() {
    let server = MockServer::start().await;
    mount_page(&server, 1, listing_page(&["a"])).await;
    mount_page(&server, 2, listing_page(&["b"])).await;
    mount_page(&server, 3, listing_page(&[])).await;

    let mut config = create_test_config(&server.uri());
    config.fetcher.rate_limit_ms = 100;

    let orchestrator = orchestrator(config);
    let start = Instant::now();
    let records = orchestrator.crawl(10).await;
    let elapsed = start.elapsed();

    assert_eq!(records.len(), 2);
    // Three requests, so at least two full intervals passed
    assert!(
        elapsed.as_millis() >= 200,
        "requests too close together: {:?}",
        elapsed
    );
}

/// Detail source that fails a chosen record and enriches the rest
struct FlakySource {
    failing_goods_no: String,
}

#[async_trait]
impl DetailSource for FlakySource {
    async fn fetch_detail(&self, record: &ListingRecord, max_reviews: usize) -> DetailInfo {
        if record.goods_no.as_deref() == Some(self.failing_goods_no.as_str()) {
            return DetailInfo {
                extraction_error: Some("stage timed out".to_string()),
                ..DetailInfo::default()
            };
        }
        DetailInfo {
            ingredients: vec!["water".to_string()],
            reviews: (0..max_reviews.min(2))
                .map(|i| format!("review {}", i))
                .collect(),
            ..DetailInfo::default()
        }
    }
}

#[tokio::test]
async fn test_enrichment_isolates_a_failing_record() {
    let server = MockServer::start().await;
    mount_page(&server, 1, listing_page(&["a", "b", "c"])).await;

    let orchestrator = orchestrator(create_test_config(&server.uri()));
    let records = orchestrator.crawl(1).await;
    assert_eq!(records.len(), 3);

    let source = FlakySource {
        failing_goods_no: "G1".to_string(),
    };
    let enriched = orchestrator.enrich(&source, records, 5).await;

    assert_eq!(enriched.len(), 3);

    // Neighbors enriched normally
    assert_eq!(enriched[0].detail.ingredients, vec!["water"]);
    assert_eq!(enriched[2].detail.reviews.len(), 2);

    // The failing record keeps its listing fields and carries the fault
    let failed = &enriched[1];
    assert_eq!(failed.listing.name.as_deref(), Some("b"));
    assert_eq!(failed.listing.price, 2900);
    assert!(failed.detail.ingredients.is_empty());
    assert_eq!(
        failed.detail.extraction_error.as_deref(),
        Some("stage timed out")
    );
}

#[tokio::test]
async fn test_image_downloads_are_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/img/G0.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&server.uri());
    config.output.dir = dir.path().to_string_lossy().into_owned();

    let orchestrator = orchestrator(config.clone());
    let listing = ListingRecord {
        rank: 1,
        name: Some("pictured".to_string()),
        brand: None,
        price: 1000,
        rating: 4.0,
        category: "test".to_string(),
        goods_no: Some("G0".to_string()),
        detail_url: format!("{}/d?goodsNo=G0", server.uri()),
        image_url: Some(format!("{}/img/G0.jpg", server.uri())),
    };
    let mut records = vec![shelfrank::records::EnrichedRecord::bare(listing)];

    orchestrator.download_images(&mut records).await.unwrap();
    let image_path = records[0].image_path.clone().expect("image not downloaded");
    assert!(std::path::Path::new(&image_path).exists());

    // Second pass finds the file on disk and does not refetch (the mock
    // expects exactly one hit)
    records[0].image_path = None;
    orchestrator.download_images(&mut records).await.unwrap();
    assert_eq!(records[0].image_path.as_deref(), Some(image_path.as_str()));
}

#[tokio::test]
async fn test_export_writes_csv_and_sqlite() {
    let server = MockServer::start().await;
    mount_page(&server, 1, listing_page(&["exported"])).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&server.uri());
    config.output.dir = dir.path().join("out").to_string_lossy().into_owned();

    let orchestrator = orchestrator(config.clone());
    let records = orchestrator.crawl(1).await;
    let enriched: Vec<_> = records
        .into_iter()
        .map(shelfrank::records::EnrichedRecord::bare)
        .collect();

    export_all(&enriched, &config.output).unwrap();

    let csv_content = std::fs::read_to_string(config.output.csv_path()).unwrap();
    let header = csv_content.lines().next().unwrap();
    assert_eq!(header, CSV_COLUMNS.join(","));
    assert!(csv_content.contains("exported"));
    assert!(config.output.db_path().exists());
}
