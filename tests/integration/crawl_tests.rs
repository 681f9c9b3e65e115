//! Integration tests for the crawler
//!
//! These tests run full crawls against wiremock servers and check what was
//! fetched, what was collected and how the render tier was used.

use crate::common::{
    coordinator, coordinator_with_renderer, html_page, mount_html, mount_xml, test_config,
    urlset, StubRenderer,
};
use site_sync::crawler::{CrawlOptions, FetchError};
use site_sync::url::SiteRoot;
use site_sync::SyncError;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_full_crawl_follows_links() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(
        &server,
        "/",
        html_page(
            "Home",
            &[format!("{}/page1", base), "/page2".to_string(), "https://other.org/x".to_string()],
        ),
    )
    .await;
    mount_html(&server, "/page1", html_page("Page 1", &["/page3".to_string()])).await;
    mount_html(&server, "/page2", html_page("Page 2", &[])).await;
    mount_html(&server, "/page3", html_page("Page 3", &["/".to_string()])).await;

    let config = test_config();
    let site = SiteRoot::parse(&base).unwrap();
    let report = coordinator(&config)
        .crawl(&site, &CrawlOptions::from_config(&config.crawler))
        .await
        .unwrap();

    let mut urls: Vec<&str> = report.pages.iter().map(|p| p.url.as_str()).collect();
    urls.sort();
    assert_eq!(
        urls,
        vec![
            format!("{}/", base),
            format!("{}/page1", base),
            format!("{}/page2", base),
            format!("{}/page3", base),
        ]
    );

    let home = report
        .pages
        .iter()
        .find(|p| p.title == "Home")
        .expect("homepage record");
    assert_eq!(home.domain, "127.0.0.1");
    assert_eq!(
        home.links,
        vec![format!("{}/page1", base), format!("{}/page2", base)]
    );
    assert!(!home.used_fallback);
    assert!(!report.sitemap_valid);
    assert!(report.failed.is_empty());
}

#[tokio::test]
async fn test_each_url_fetched_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(&server, "/sitemap.xml", urlset(&base, &[("/a", None), ("/b", None)])).await;
    for (at, links) in [
        ("/", vec!["/a", "/b", "/a/"]),
        ("/a", vec!["/", "/b", "/a#top"]),
        ("/b", vec!["/", "/a", "/b/"]),
    ] {
        let links: Vec<String> = links.into_iter().map(String::from).collect();
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_string(html_page(at, &links)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let config = test_config();
    let site = SiteRoot::parse(&base).unwrap();
    let report = coordinator(&config)
        .crawl(&site, &CrawlOptions::from_config(&config.crawler))
        .await
        .unwrap();

    assert_eq!(report.pages.len(), 3);
    assert!(report.sitemap_valid);
    server.verify().await;
}

#[tokio::test]
async fn test_relative_links_resolve_after_redirect() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(&server, "/", html_page("Home", &["/blog".to_string()])).await;
    Mock::given(method("GET"))
        .and(path("/blog"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/blog/"))
        .mount(&server)
        .await;
    mount_html(&server, "/blog/", html_page("Blog", &["post-1".to_string()])).await;
    mount_html(&server, "/blog/post-1", html_page("Post 1", &[])).await;

    let config = test_config();
    let site = SiteRoot::parse(&base).unwrap();
    let report = coordinator(&config)
        .crawl(&site, &CrawlOptions::from_config(&config.crawler))
        .await
        .unwrap();

    assert!(report.failed.is_empty(), "failed: {:?}", report.failed);
    let blog = report
        .pages
        .iter()
        .find(|p| p.title == "Blog")
        .expect("blog record");
    assert_eq!(blog.url, format!("{}/blog", base));
    assert_eq!(blog.links, vec![format!("{}/blog/post-1", base)]);
    assert!(report
        .pages
        .iter()
        .any(|p| p.url == format!("{}/blog/post-1", base)));
}

#[tokio::test]
async fn test_max_pages_cutoff() {
    let server = MockServer::start().await;
    let base = server.uri();

    let paths: Vec<String> = (0..10).map(|i| format!("/p{}", i)).collect();
    let entries: Vec<(&str, Option<&str>)> = paths.iter().map(|p| (p.as_str(), None)).collect();
    mount_xml(&server, "/sitemap.xml", urlset(&base, &entries)).await;
    mount_html(&server, "/", html_page("Home", &paths)).await;
    for p in &paths {
        mount_html(&server, p, html_page(p, &paths)).await;
    }

    let config = test_config();
    let site = SiteRoot::parse(&base).unwrap();
    let options = CrawlOptions::from_config(&config.crawler).with_max_pages(4);
    let report = coordinator(&config).crawl(&site, &options).await.unwrap();

    assert_eq!(report.pages.len(), 4);
    assert_eq!(report.pages[0].url, format!("{}/", base));

    let requests = server.received_requests().await.unwrap_or_default();
    let page_requests = requests
        .iter()
        .filter(|r| paths.iter().any(|p| p == r.url.path()))
        .count();
    assert_eq!(page_requests, 3, "no fetches beyond the cap");
}

#[tokio::test]
async fn test_static_timeout_uses_render_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(3))
                .set_body_string(html_page("Too slow", &[])),
        )
        .mount(&server)
        .await;

    let mut config = test_config();
    config.fetch.request_timeout_secs = 1;
    let renderer = StubRenderer::new(Ok(
        "<html><head><title>Rendered</title></head><body><p>app</p></body></html>".to_string(),
    ));

    let site = SiteRoot::parse(&server.uri()).unwrap();
    let report = coordinator_with_renderer(&config, renderer.clone())
        .crawl(&site, &CrawlOptions::from_config(&config.crawler))
        .await
        .unwrap();

    assert_eq!(report.pages.len(), 1);
    let page = &report.pages[0];
    assert!(page.used_fallback);
    assert_eq!(page.title, "Rendered");
    assert_eq!(report.fallback_count, 1);
    assert_eq!(renderer.renders(), 1);
    assert_eq!(renderer.closes(), 1, "render tier closed at end of run");
}

#[tokio::test]
async fn test_failed_pages_are_reported() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(
        &server,
        "/",
        html_page("Home", &["/missing".to_string(), "/ok".to_string()]),
    )
    .await;
    mount_html(&server, "/ok", html_page("Ok", &[])).await;

    let config = test_config();
    let site = SiteRoot::parse(&base).unwrap();
    let report = coordinator(&config)
        .crawl(&site, &CrawlOptions::from_config(&config.crawler))
        .await
        .unwrap();

    assert_eq!(report.pages.len(), 2);
    assert_eq!(report.failed, vec![format!("{}/missing", base)]);
}

#[tokio::test]
async fn test_robots_and_exclude_patterns_are_skipped() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"),
        )
        .mount(&server)
        .await;
    mount_html(
        &server,
        "/",
        html_page(
            "Home",
            &["/private/report".to_string(), "/cart".to_string(), "/public".to_string()],
        ),
    )
    .await;
    mount_html(&server, "/public", html_page("Public", &[])).await;
    for never in ["/private/report", "/cart"] {
        Mock::given(method("GET"))
            .and(path(never))
            .respond_with(ResponseTemplate::new(200).set_body_string(html_page("No", &[])))
            .expect(0)
            .mount(&server)
            .await;
    }

    let config = test_config();
    let site = SiteRoot::parse(&base).unwrap();
    let report = coordinator(&config)
        .crawl(&site, &CrawlOptions::from_config(&config.crawler))
        .await
        .unwrap();

    assert_eq!(report.pages.len(), 2);
    assert_eq!(report.skipped, 2);
    server.verify().await;
}

#[tokio::test]
async fn test_fatal_render_error_aborts_crawl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = test_config();
    let renderer = StubRenderer::new(Err(FetchError::BrowserUnavailable(
        "chrome not found".to_string(),
    )));

    let site = SiteRoot::parse(&server.uri()).unwrap();
    let result = coordinator_with_renderer(&config, renderer.clone())
        .crawl(&site, &CrawlOptions::from_config(&config.crawler))
        .await;

    assert!(matches!(result, Err(SyncError::CrawlFatal(_))));
    assert_eq!(renderer.closes(), 1);
}
