//! Discovery against mock sites

use crate::common::{coordinator, mount_xml, sitemap_index, test_config, urlset};
use site_sync::crawler::CrawlOptions;
use site_sync::url::SiteRoot;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_robots_declared_sitemap() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("User-agent: *\nAllow: /\nSitemap: {}/site-map.xml", base)),
        )
        .mount(&server)
        .await;
    mount_xml(
        &server,
        "/site-map.xml",
        urlset(&base, &[("/", None), ("/about", None), ("/blog", None)]),
    )
    .await;

    let config = test_config();
    let site = SiteRoot::parse(&base).unwrap();
    let discovery = coordinator(&config)
        .discover(&site, &CrawlOptions::from_config(&config.crawler))
        .await;

    assert!(discovery.sitemap_valid);
    assert!(discovery.robots.is_some());
    for expected in ["/", "/about", "/blog"] {
        assert!(
            discovery.seed_urls.contains(&format!("{}{}", base, expected)),
            "missing {}",
            expected
        );
    }
    assert_eq!(discovery.seed_urls.len(), 3);
}

#[tokio::test]
async fn test_index_yields_every_child_url() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap_index.xml",
        sitemap_index(&base, &["/posts.xml", "/pages.xml"]),
    )
    .await;
    mount_xml(
        &server,
        "/posts.xml",
        urlset(&base, &[("/p1", None), ("/p2", None), ("/p3", None)]),
    )
    .await;
    mount_xml(
        &server,
        "/pages.xml",
        urlset(&base, &[("/a", None), ("/b", None), ("/c", None)]),
    )
    .await;

    let config = test_config();
    let site = SiteRoot::parse(&base).unwrap();
    let discovery = coordinator(&config)
        .discover(&site, &CrawlOptions::from_config(&config.crawler))
        .await;

    assert!(discovery.sitemap_valid);
    assert_eq!(discovery.seed_urls.len(), 6);
    assert!(discovery.seed_urls.contains(&format!("{}/p3", base)));
    assert!(discovery.seed_urls.contains(&format!("{}/a", base)));
}

#[tokio::test]
async fn test_no_sitemap_seeds_homepage() {
    let server = MockServer::start().await;

    let config = test_config();
    let site = SiteRoot::parse(&server.uri()).unwrap();
    let discovery = coordinator(&config)
        .discover(&site, &CrawlOptions::from_config(&config.crawler))
        .await;

    assert!(!discovery.sitemap_valid);
    assert!(discovery.robots.is_none());
    assert_eq!(
        discovery.seed_urls.into_iter().collect::<Vec<_>>(),
        vec![site.root_url()]
    );
}

#[tokio::test]
async fn test_sitemap_lastmod_is_kept() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        urlset(&base, &[("/news", Some("2024-03-01T12:00:00+00:00"))]),
    )
    .await;

    let config = test_config();
    let site = SiteRoot::parse(&base).unwrap();
    let discovery = coordinator(&config)
        .discover(&site, &CrawlOptions::from_config(&config.crawler))
        .await;

    let entry = discovery
        .sitemap_entries
        .get(&format!("{}/news", base))
        .expect("entry for /news");
    assert_eq!(
        entry.last_modified.map(|t| t.to_rfc3339()),
        Some("2024-03-01T12:00:00+00:00".to_string())
    );
}
