//! Background sync jobs

use crate::common::{coordinator, html_page, mount_html, test_config};
use site_sync::storage::{PageStore, SqliteStore, SyncStatus};
use site_sync::sync::{spawn_sync_job, Reconciler, SyncJobRequest};
use site_sync::SyncError;
use std::sync::Arc;
use wiremock::MockServer;

async fn linked_site(pages: usize) -> MockServer {
    let server = MockServer::start().await;
    let paths: Vec<String> = (0..pages).map(|i| format!("/page{}", i)).collect();
    mount_html(&server, "/", html_page("Home", &paths)).await;
    for p in &paths {
        mount_html(&server, p, html_page(p, &[])).await;
    }
    server
}

fn reconciler(store: Arc<SqliteStore>) -> Arc<Reconciler> {
    let config = test_config();
    Arc::new(Reconciler::with_coordinator(&config, store, coordinator(&config)))
}

#[tokio::test]
async fn test_job_is_acknowledged_then_stored() {
    let server = linked_site(3).await;
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());

    let (ack, handle) = spawn_sync_job(
        reconciler(store.clone()),
        SyncJobRequest::new(server.uri(), "u1"),
    )
    .unwrap();

    assert_eq!(ack.status, "processing");
    assert_eq!(ack.domain, server.uri());
    assert_eq!(ack.user_id, "u1");

    handle.await.unwrap();

    let pages = store.get_discovered_pages("u1").await.unwrap();
    assert_eq!(pages.len(), 4);
    assert!(pages
        .iter()
        .all(|p| p.sync_status == Some(SyncStatus::Synced)));
}

#[tokio::test]
async fn test_job_overrides_apply() {
    let server = linked_site(5).await;
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());

    let request: SyncJobRequest = serde_json::from_str(&format!(
        r#"{{"domain":"{}","userId":"u2","maxPages":2}}"#,
        server.uri()
    ))
    .unwrap();
    let (_ack, handle) = spawn_sync_job(reconciler(store.clone()), request).unwrap();
    handle.await.unwrap();

    assert_eq!(store.count_pages("u2").unwrap(), 2);
}

#[tokio::test]
async fn test_failing_job_still_acknowledged() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());

    let (ack, handle) = spawn_sync_job(
        reconciler(store.clone()),
        SyncJobRequest::new("not a domain", "u3"),
    )
    .unwrap();

    assert_eq!(ack.status, "processing");
    handle.await.unwrap();
    assert_eq!(store.count_pages("u3").unwrap(), 0);
}

#[tokio::test]
async fn test_unusable_overrides_are_refused_before_spawning() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());

    for body in [
        r#"{"domain":"example.com","userId":"u4","maxPages":0}"#,
        r#"{"domain":"example.com","userId":"u4","excludePatterns":["[unclosed"]}"#,
    ] {
        let request: SyncJobRequest = serde_json::from_str(body).unwrap();
        let result = spawn_sync_job(reconciler(store.clone()), request);
        assert!(matches!(result, Err(SyncError::Config(_))), "accepted {}", body);
    }
}
