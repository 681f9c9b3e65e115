//! End-to-end reconciliation against mock sites and an in-memory store

use crate::common::{
    coordinator, coordinator_with_renderer, html_page, mount_html, mount_xml, test_config, urlset,
    StubRenderer,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use site_sync::crawler::FetchError;
use site_sync::storage::{
    CrawlSummary, PageRecord, PageStore, RunStatus, SqliteStore, StoreError, StoreResult,
    StoredPage, SyncStatus,
};
use site_sync::sync::{Reconciler, SyncResult};
use site_sync::SyncError;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER: &str = "user-1";

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
}

fn record(url: String, last_modified: Option<DateTime<Utc>>) -> PageRecord {
    PageRecord {
        url,
        domain: "127.0.0.1".to_string(),
        title: "Stored".to_string(),
        description: None,
        last_modified,
        change_frequency: None,
        priority: None,
        links: Vec::new(),
        used_fallback: false,
    }
}

/// Stores pages and marks them with `status`
async fn seed(store: &SqliteStore, pages: &[PageRecord], status: SyncStatus) {
    store.upsert_pages(USER, pages).await.unwrap();
    for page in pages {
        store
            .update_sync_status(&page.url, USER, status, day(1))
            .await
            .unwrap();
    }
}

/// Site with `/` and `/about` in its sitemap; `/about` was modified on day 2
async fn two_page_site() -> MockServer {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        urlset(
            &base,
            &[
                ("/", Some("2024-01-01T00:00:00+00:00")),
                ("/about", Some("2024-01-02T00:00:00+00:00")),
            ],
        ),
    )
    .await;
    mount_html(&server, "/", html_page("Home", &[])).await;
    mount_html(&server, "/about", html_page("About", &[])).await;
    server
}

/// SQLite store whose status writes fail for one URL
struct FailingStatusStore {
    inner: Arc<SqliteStore>,
    failing_url: String,
}

#[async_trait]
impl PageStore for FailingStatusStore {
    async fn get_discovered_pages(&self, user_id: &str) -> StoreResult<Vec<StoredPage>> {
        self.inner.get_discovered_pages(user_id).await
    }

    async fn upsert_pages(&self, user_id: &str, pages: &[PageRecord]) -> StoreResult<usize> {
        self.inner.upsert_pages(user_id, pages).await
    }

    async fn update_sync_status(
        &self,
        url: &str,
        user_id: &str,
        status: SyncStatus,
        timestamp: DateTime<Utc>,
    ) -> StoreResult<()> {
        if url == self.failing_url {
            return Err(StoreError::Database("disk I/O error".to_string()));
        }
        self.inner
            .update_sync_status(url, user_id, status, timestamp)
            .await
    }

    async fn update_crawl_summary(
        &self,
        user_id: &str,
        domain: &str,
        summary: &CrawlSummary,
    ) -> StoreResult<()> {
        self.inner.update_crawl_summary(user_id, domain, summary).await
    }

    async fn get_crawl_summary(
        &self,
        user_id: &str,
        domain: &str,
    ) -> StoreResult<Option<CrawlSummary>> {
        self.inner.get_crawl_summary(user_id, domain).await
    }
}

fn reconciler(store: Arc<SqliteStore>) -> Reconciler {
    let config = test_config();
    Reconciler::with_coordinator(&config, store, coordinator(&config))
}

#[tokio::test]
async fn test_changed_and_vanished_pages() {
    let server = two_page_site().await;
    let base = server.uri();
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    seed(
        &store,
        &[
            record(format!("{}/", base), Some(day(1))),
            record(format!("{}/about", base), Some(day(1))),
            record(format!("{}/old", base), Some(day(1))),
        ],
        SyncStatus::Synced,
    )
    .await;

    let result = reconciler(store.clone()).sync(&base, USER).await.unwrap();

    assert_eq!(
        result,
        SyncResult {
            added: 0,
            updated: 1,
            removed: 1,
            errors: vec![],
        }
    );

    let old = store.get_page(USER, &format!("{}/old", base)).unwrap().unwrap();
    assert_eq!(old.sync_status, Some(SyncStatus::Removed));

    let about = store.get_page(USER, &format!("{}/about", base)).unwrap().unwrap();
    assert_eq!(about.last_modified, Some(day(2)));
    assert_eq!(about.title, "About");
    assert_eq!(about.sync_status, Some(SyncStatus::Synced));

    let summary = store.get_crawl_summary(USER, "127.0.0.1").await.unwrap();
    assert_eq!(
        summary,
        Some(CrawlSummary {
            page_count: 2,
            sitemap_valid: true,
            status: RunStatus::Completed,
        })
    );
}

#[tokio::test]
async fn test_first_sync_adds_everything_and_second_is_quiet() {
    let server = two_page_site().await;
    let base = server.uri();
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let reconciler = reconciler(store.clone());

    let first = reconciler.sync(&base, USER).await.unwrap();
    assert_eq!(first.added, 2);
    assert_eq!(first.updated + first.removed, 0);
    assert_eq!(store.count_pages(USER).unwrap(), 2);

    let second = reconciler.sync(&base, USER).await.unwrap();
    assert_eq!(second, SyncResult::default());
}

#[tokio::test]
async fn test_removed_page_that_returns_is_updated() {
    let server = two_page_site().await;
    let base = server.uri();
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    seed(
        &store,
        &[
            record(format!("{}/", base), Some(day(1))),
            record(format!("{}/about", base), Some(day(2))),
        ],
        SyncStatus::Synced,
    )
    .await;
    seed(
        &store,
        &[
            record(format!("{}/about", base), Some(day(2))),
            record(format!("{}/gone", base), None),
        ],
        SyncStatus::Removed,
    )
    .await;

    let result = reconciler(store.clone()).sync(&base, USER).await.unwrap();

    assert_eq!(result.added, 0);
    assert_eq!(result.updated, 1);
    assert_eq!(result.removed, 0, "already removed pages are not counted again");

    let about = store.get_page(USER, &format!("{}/about", base)).unwrap().unwrap();
    assert_eq!(about.sync_status, Some(SyncStatus::Synced));
    let gone = store.get_page(USER, &format!("{}/gone", base)).unwrap().unwrap();
    assert_eq!(gone.sync_status, Some(SyncStatus::Removed));
}

#[tokio::test]
async fn test_pages_of_other_sites_are_ignored() {
    let server = two_page_site().await;
    let base = server.uri();
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let mut foreign = record("https://other.org/page".to_string(), None);
    foreign.domain = "other.org".to_string();
    seed(&store, &[foreign], SyncStatus::Synced).await;

    let result = reconciler(store.clone()).sync(&base, USER).await.unwrap();

    assert_eq!(result.added, 2);
    assert_eq!(result.removed, 0);
    let foreign = store.get_page(USER, "https://other.org/page").unwrap().unwrap();
    assert_eq!(foreign.sync_status, Some(SyncStatus::Synced));
}

#[tokio::test]
async fn test_status_write_failure_is_collected_and_sync_continues() {
    let server = two_page_site().await;
    let base = server.uri();
    let sqlite = Arc::new(SqliteStore::open_in_memory().unwrap());
    let old = format!("{}/old", base);
    seed(&sqlite, &[record(old.clone(), Some(day(1)))], SyncStatus::Synced).await;

    let about = format!("{}/about", base);
    let store = Arc::new(FailingStatusStore {
        inner: sqlite.clone(),
        failing_url: about.clone(),
    });
    let config = test_config();
    let reconciler = Reconciler::with_coordinator(&config, store, coordinator(&config));

    let result = reconciler.sync(&base, USER).await.unwrap();

    assert_eq!(result.added, 1, "only the home page was marked");
    assert_eq!(result.removed, 1);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with(&about), "{}", result.errors[0]);

    let home = sqlite.get_page(USER, &format!("{}/", base)).unwrap().unwrap();
    assert_eq!(home.sync_status, Some(SyncStatus::Synced));
    let old = sqlite.get_page(USER, &old).unwrap().unwrap();
    assert_eq!(old.sync_status, Some(SyncStatus::Removed));
    let about = sqlite.get_page(USER, &about).unwrap().unwrap();
    assert_eq!(about.sync_status, None);

    assert_eq!(
        sqlite.get_crawl_summary(USER, "127.0.0.1").await.unwrap(),
        Some(CrawlSummary {
            page_count: 2,
            sitemap_valid: true,
            status: RunStatus::Completed,
        })
    );
}

#[tokio::test]
async fn test_fatal_crawl_records_failed_summary() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let config = test_config();
    let renderer = StubRenderer::new(Err(FetchError::BrowserUnavailable(
        "chrome not found".to_string(),
    )));
    let reconciler = Reconciler::with_coordinator(
        &config,
        store.clone(),
        coordinator_with_renderer(&config, renderer),
    );

    let result = reconciler.sync(&server.uri(), USER).await;

    assert!(matches!(result, Err(SyncError::CrawlFatal(_))));
    assert_eq!(
        store.get_crawl_summary(USER, "127.0.0.1").await.unwrap(),
        Some(CrawlSummary::failed())
    );
    assert_eq!(store.count_pages(USER).unwrap(), 0);
}

#[tokio::test]
async fn test_invalid_domain_is_rejected() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let result = reconciler(store).sync("", USER).await;
    assert!(matches!(result, Err(SyncError::InvalidDomain(_))));
}

#[tokio::test]
async fn test_zero_page_cap_leaves_inventory_alone() {
    let server = two_page_site().await;
    let base = server.uri();
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let home = format!("{}/", base);
    seed(&store, &[record(home.clone(), Some(day(1)))], SyncStatus::Synced).await;

    let reconciler = reconciler(store.clone());
    let options = reconciler.options().clone().with_max_pages(0);
    let result = reconciler.sync_with_options(&base, USER, &options).await;

    assert!(matches!(result, Err(SyncError::Config(_))));
    let page = store.get_page(USER, &home).unwrap().unwrap();
    assert_eq!(page.sync_status, Some(SyncStatus::Synced));
}
