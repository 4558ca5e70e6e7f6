//! End-to-end tests against a local HTTP feed.
//!
//! Uses `wiremock` to stand up a feed server per test so no real network
//! traffic is made.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vitrine_catalog::{
    write_snapshot, CacheSettings, Catalog, CatalogCache, CatalogError, DirectoryKv, FeedClient,
    SnapshotKeys, SourceBackend,
};
use vitrine_core::{CatalogTuning, ProductQuery};

const FEED_PATH: &str = "/pub.csv";

const FEED_CSV: &str = "\
ID,Title,Description,Sale_Price,Price,Link,Image_Link,Store,Category,Brand\n\
A1,Trail Runner,\"Light, fast\",,199.90,https://shop.example.com/a1,https://cdn.example.com/a1.jpg,Acme,\"Shoes, Sports\",Stride\n\
A2,Kettle,Steel,59.00,79.00,https://shop.example.com/a2,https://cdn.example.com/a2.jpg,HomeCo,Kitchen,Boil\n\
leaked description text,x,y,z,w,v,u,t,s,r\n";

fn feed_client(server: &MockServer, max_retries: u32) -> FeedClient {
    FeedClient::new(
        format!("{}{FEED_PATH}", server.uri()),
        5,
        "vitrine-test/0.1",
        max_retries,
        0,
    )
    .expect("failed to build test FeedClient")
}

fn feed_catalog(server: &MockServer) -> Catalog {
    Catalog::new(
        SourceBackend::Feed(feed_client(server, 0)),
        &CatalogTuning::default(),
    )
}

// ---------------------------------------------------------------------------
// Feed client
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_csv_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_CSV))
        .expect(1)
        .mount(&server)
        .await;

    let body = feed_client(&server, 0).fetch_csv().await.expect("feed body");
    assert_eq!(body, FEED_CSV);
}

#[tokio::test]
async fn not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = feed_client(&server, 3).fetch_csv().await.unwrap_err();
    assert!(
        matches!(err, CatalogError::UnexpectedStatus { status: 404, .. }),
        "expected 404, got: {err:?}"
    );
    assert!(err.is_source_unavailable());
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let err = feed_client(&server, 2).fetch_csv().await.unwrap_err();
    assert!(matches!(err, CatalogError::UnexpectedStatus { status: 503, .. }));
}

#[tokio::test]
async fn rate_limit_reports_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let err = feed_client(&server, 0).fetch_csv().await.unwrap_err();
    assert!(
        matches!(err, CatalogError::RateLimited { retry_after_secs: 7 }),
        "expected RateLimited, got: {err:?}"
    );
}

#[tokio::test]
async fn rate_limited_fetch_retries_after_the_requested_pause() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_CSV))
        .expect(1)
        .mount(&server)
        .await;

    let started = std::time::Instant::now();
    let body = feed_client(&server, 1).fetch_csv().await.expect("feed body");
    assert_eq!(body, FEED_CSV);
    assert!(started.elapsed() >= Duration::from_secs(1));
}

// ---------------------------------------------------------------------------
// Catalog over the feed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_queries_trigger_a_single_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(FEED_CSV)
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let catalog = feed_catalog(&server);
    let pages = join_all((0..20).map(|_| {
        let catalog = catalog.clone();
        async move {
            catalog
                .products_page(&ProductQuery {
                    search_term: "kettle".to_owned(),
                    ..ProductQuery::default()
                })
                .await
        }
    }))
    .await;

    assert!(pages.iter().all(|p| p.total_count == 1));
}

#[tokio::test]
async fn feed_rows_are_normalized_and_headers_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_CSV))
        .mount(&server)
        .await;

    let catalog = feed_catalog(&server);
    let page = catalog
        .products_page(&ProductQuery {
            offset: 0,
            limit: 10,
            category: "sports".to_owned(),
            ..ProductQuery::default()
        })
        .await;
    assert_eq!(page.total_count, 1);
    let runner = &page.products[0];
    assert_eq!(runner.price, "199.90");
    assert_eq!(runner.description, "Light, fast");
    assert_eq!(
        page.headers.as_ref().map(|h| h[0].as_str()),
        Some("ID")
    );

    let kettle = catalog.product_by_id("A2").await.expect("A2 present");
    assert_eq!(kettle.price, "59.00");
    assert_eq!(kettle.button_text, "Buy at Store: HomeCo");

    let filters = catalog.filter_options().await;
    assert_eq!(filters.stores, vec!["Acme", "HomeCo"]);
    assert_eq!(filters.categories, vec!["Kitchen", "Shoes", "Sports"]);
}

#[tokio::test]
async fn first_fetch_failure_yields_empty_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let catalog = feed_catalog(&server);
    let page = catalog.products_page(&ProductQuery::default()).await;
    assert_eq!(page.total_count, 0);
    assert!(page.products.is_empty());
    assert!(catalog.product_by_id("A1").await.is_none());
}

#[tokio::test]
async fn stale_table_survives_a_failed_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_CSV))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let cache = CatalogCache::new(
        SourceBackend::Feed(feed_client(&server, 0)),
        CacheSettings {
            ttl: Duration::from_millis(50),
            ..CacheSettings::default()
        },
    );
    assert_eq!(cache.refresh().await.expect("first load").len(), 2);

    tokio::time::sleep(Duration::from_millis(80)).await;
    let err = cache.refresh().await.unwrap_err();
    assert!(err.is_source_unavailable());

    let table = cache.get_table().await;
    assert_eq!(table.len(), 2);
    assert!(table.get("A1").is_some());
}

// ---------------------------------------------------------------------------
// Snapshot export
// ---------------------------------------------------------------------------

#[tokio::test]
async fn feed_exported_to_snapshot_reads_back_identically() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_CSV))
        .mount(&server)
        .await;

    let feed = CatalogCache::new(
        SourceBackend::Feed(feed_client(&server, 0)),
        CacheSettings::default(),
    );
    let table = feed.refresh().await.expect("feed loads");

    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(DirectoryKv::new(dir.path()));
    let keys = SnapshotKeys::default();
    let chunks = write_snapshot(store.as_ref(), &keys, table.products(), 1)
        .await
        .expect("snapshot written");
    assert_eq!(chunks, 2);

    let snapshot = Catalog::new(
        SourceBackend::Snapshot(vitrine_catalog::SnapshotSource::new(store, keys)),
        &CatalogTuning::default(),
    );
    for product in table.products() {
        assert_eq!(
            snapshot.product_by_id(&product.id).await.as_ref(),
            Some(product)
        );
    }
    let page = snapshot.products_page(&ProductQuery::default()).await;
    assert_eq!(page.total_count, 2);
    assert!(page.headers.is_none());
}
