//! Shared fixtures for the integration tests

use async_trait::async_trait;
use site_sync::config::Config;
use site_sync::crawler::{Coordinator, FetchError, Renderer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fast configuration: no inter-batch delay, short timeouts, no browser
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.crawler.batch_delay_ms = 0;
    config.crawler.concurrency = 3;
    config.fetch.request_timeout_secs = 2;
    config.fetch.probe_timeout_secs = 2;
    config.fetch.render_fallback = false;
    config.user_agent.crawler_name = "TestBot".to_string();
    config
}

pub fn coordinator(config: &Config) -> Coordinator {
    Coordinator::new(config)
        .expect("Failed to build coordinator")
        .without_renderer()
}

/// In-process render tier returning a fixed result
pub struct StubRenderer {
    result: Result<String, FetchError>,
    renders: AtomicUsize,
    closes: AtomicUsize,
}

impl StubRenderer {
    pub fn new(result: Result<String, FetchError>) -> Arc<Self> {
        Arc::new(Self {
            result,
            renders: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        })
    }

    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for StubRenderer {
    async fn render(&self, _url: &str) -> Result<String, FetchError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Coordinator whose every run uses `renderer` as the render tier
pub fn coordinator_with_renderer(config: &Config, renderer: Arc<StubRenderer>) -> Coordinator {
    coordinator(config).with_renderer_factory(move || -> Arc<dyn Renderer> { renderer.clone() })
}

/// Minimal HTML page with a title and anchors to `links`
pub fn html_page(title: &str, links: &[String]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body><h1>{}</h1>{}</body></html>",
        title, title, anchors
    )
}

/// `<urlset>` listing `base + path` for every `(path, lastmod)` pair
pub fn urlset(base: &str, entries: &[(&str, Option<&str>)]) -> String {
    let urls: String = entries
        .iter()
        .map(|(path, lastmod)| match lastmod {
            Some(lastmod) => format!(
                "<url><loc>{}{}</loc><lastmod>{}</lastmod></url>",
                base, path, lastmod
            ),
            None => format!("<url><loc>{}{}</loc></url>", base, path),
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
        urls
    )
}

/// `<sitemapindex>` pointing at `base + path` for every path
pub fn sitemap_index(base: &str, paths: &[&str]) -> String {
    let sitemaps: String = paths
        .iter()
        .map(|p| format!("<sitemap><loc>{}{}</loc></sitemap>", base, p))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</sitemapindex>"#,
        sitemaps
    )
}

pub async fn mount_xml(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/xml")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

pub async fn mount_html(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}
