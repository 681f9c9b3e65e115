//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties one run together:
//! - Discovering seed URLs
//! - Seeding and draining the frontier in bounded parallel batches
//! - Fetching, extracting and following links for each URL
//! - Owning the render tier for the run and tearing it down at the end

use crate::config::{Config, CrawlerConfig};
use crate::ConfigError;
use crate::crawler::browser::ChromiumBackend;
use crate::crawler::extractor::parse_html;
use crate::crawler::fetcher::{build_http_client, FetchError, Fetcher, Renderer};
use crate::crawler::frontier::Frontier;
use crate::crawler::pool::SessionPool;
use crate::discovery::{Discoverer, Discovery};
use crate::storage::PageRecord;
use crate::url::{normalize_url_with, ExcludeMatcher, NormalizeOptions, SiteRoot};
use crate::SyncError;
use futures::future::join_all;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Upper bound applied to a robots.txt `Crawl-delay`
const MAX_CRAWL_DELAY: Duration = Duration::from_secs(10);

/// Per-run crawl settings
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlOptions {
    pub max_pages: usize,
    pub concurrency: usize,
    pub batch_delay: Duration,
    pub follow_external_links: bool,
    pub ignore_query_params: bool,
    pub respect_robots: bool,
    pub exclude_patterns: Vec<String>,
}

/// Optional per-job overrides of the configured crawl settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlOverrides {
    pub max_pages: Option<usize>,
    pub follow_external_links: Option<bool>,
    pub ignore_query_params: Option<bool>,
    pub exclude_patterns: Option<Vec<String>>,
}

impl CrawlOptions {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            concurrency: config.concurrency.max(1),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
            follow_external_links: config.follow_external_links,
            ignore_query_params: config.ignore_query_params,
            respect_robots: config.respect_robots,
            exclude_patterns: config.exclude_patterns.clone(),
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Applies every override that is set
    pub fn with_overrides(mut self, overrides: &CrawlOverrides) -> Self {
        if let Some(max_pages) = overrides.max_pages {
            self.max_pages = max_pages;
        }
        if let Some(follow) = overrides.follow_external_links {
            self.follow_external_links = follow;
        }
        if let Some(ignore) = overrides.ignore_query_params {
            self.ignore_query_params = ignore;
        }
        if let Some(patterns) = &overrides.exclude_patterns {
            self.exclude_patterns = patterns.clone();
        }
        self
    }

    /// Rejects options no crawl can run with
    ///
    /// A zero page cap would yield an empty crawl, which reconciliation reads
    /// as every stored page having vanished.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pages < 1 {
            return Err(ConfigError::Validation(
                "max_pages must be >= 1".to_string(),
            ));
        }
        if self.concurrency < 1 {
            return Err(ConfigError::Validation(
                "concurrency must be >= 1".to_string(),
            ));
        }
        ExcludeMatcher::new(&self.exclude_patterns).map(|_| ())
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            ignore_query_params: self.ignore_query_params,
        }
    }
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

/// Result of one crawl run
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlReport {
    /// Collected page records, at most `max_pages`
    pub pages: Vec<PageRecord>,
    /// URLs that failed on every fetch tier
    pub failed: Vec<String>,
    /// Candidates skipped by exclude patterns or robots.txt
    pub skipped: usize,
    pub sitemap_valid: bool,
    /// Pages whose HTML came from the render tier
    pub fallback_count: usize,
}

type RendererFactory = Arc<dyn Fn() -> Arc<dyn Renderer> + Send + Sync>;

/// Main crawler coordinator structure
///
/// A coordinator can run any number of crawls; each run builds its own render
/// tier and closes it before returning.
pub struct Coordinator {
    client: Client,
    request_timeout: Duration,
    probe_timeout: Duration,
    robots_agent: String,
    renderer_factory: Option<RendererFactory>,
}

impl Coordinator {
    /// Creates a coordinator from configuration
    ///
    /// The headless tier uses Chromium when `render-fallback` is enabled.
    pub fn new(config: &Config) -> Result<Self, SyncError> {
        let request_timeout = Duration::from_secs(config.fetch.request_timeout_secs);
        let client = build_http_client(&config.user_agent, request_timeout)?;

        let renderer_factory: Option<RendererFactory> = if config.fetch.render_fallback {
            let user_agent = config.user_agent.user_agent_string();
            let pool_size = config.fetch.pool_size;
            let render_timeout = Duration::from_secs(config.fetch.render_timeout_secs);
            Some(Arc::new(move || -> Arc<dyn Renderer> {
                Arc::new(SessionPool::new(
                    ChromiumBackend::new(user_agent.clone()),
                    pool_size,
                    render_timeout,
                ))
            }))
        } else {
            None
        };

        Ok(Self {
            client,
            request_timeout,
            probe_timeout: Duration::from_secs(config.fetch.probe_timeout_secs),
            robots_agent: config.user_agent.robots_token().to_string(),
            renderer_factory,
        })
    }

    /// Replaces the render tier; `factory` is called once per run
    pub fn with_renderer_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn Renderer> + Send + Sync + 'static,
    {
        self.renderer_factory = Some(Arc::new(factory));
        self
    }

    /// Disables the render tier
    pub fn without_renderer(mut self) -> Self {
        self.renderer_factory = None;
        self
    }

    fn build_fetcher(&self) -> Fetcher {
        let fetcher = Fetcher::new(self.client.clone(), self.request_timeout);
        match &self.renderer_factory {
            Some(factory) => fetcher.with_renderer(factory()),
            None => fetcher,
        }
    }

    /// Runs discovery for a site without crawling it
    pub async fn discover(&self, site: &SiteRoot, options: &CrawlOptions) -> Discovery {
        Discoverer::new(self.client.clone(), self.probe_timeout)
            .with_normalize_options(options.normalize_options())
            .discover(site)
            .await
    }

    /// Crawls a site
    ///
    /// # Process
    ///
    /// 1. Discover seed URLs (robots.txt, sitemaps, homepage fallback)
    /// 2. Seed the frontier with the root, then every sitemap URL
    /// 3. Pop up to `concurrency` URLs and fetch them in parallel
    /// 4. Queue newly found links, pause, repeat until the frontier is empty
    ///    or `max_pages` records are collected
    ///
    /// Per-URL failures are recorded in the report. A fatal render-tier error
    /// aborts the run with `SyncError::CrawlFatal`.
    pub async fn crawl(
        &self,
        site: &SiteRoot,
        options: &CrawlOptions,
    ) -> Result<CrawlReport, SyncError> {
        options.validate()?;
        let matcher = ExcludeMatcher::new(&options.exclude_patterns)?;
        let normalize = options.normalize_options();

        tracing::info!(
            "Starting crawl of {} (max {} pages, concurrency {})",
            site.host(),
            options.max_pages,
            options.concurrency
        );

        let discovery = self.discover(site, options).await;

        let mut frontier = Frontier::new(
            site.clone(),
            matcher,
            normalize,
            options.follow_external_links,
        );
        let mut delay = options.batch_delay;
        if options.respect_robots {
            if let Some(robots) = &discovery.robots {
                if let Some(secs) = robots.crawl_delay(&self.robots_agent) {
                    let crawl_delay = Duration::try_from_secs_f64(secs)
                        .unwrap_or(MAX_CRAWL_DELAY)
                        .min(MAX_CRAWL_DELAY);
                    delay = delay.max(crawl_delay);
                }
                frontier = frontier.with_robots(robots.clone(), &self.robots_agent);
            }
        }

        if let Some(root) = normalize_url_with(&site.root_url(), normalize) {
            frontier.offer(&root);
        }
        for url in &discovery.seed_urls {
            frontier.offer(url);
        }
        tracing::debug!("Frontier seeded with {} URLs", frontier.queued_len());

        let fetcher = self.build_fetcher();
        let drained = self
            .drain(site, options, &discovery, &fetcher, &mut frontier, delay)
            .await;
        fetcher.shutdown().await;

        let pages = drained?;
        let fallback_count = pages.iter().filter(|p| p.used_fallback).count();
        let skipped = frontier.skipped();
        let failed = frontier.into_failed();

        tracing::info!(
            "Crawl of {} finished: {} pages, {} failed, {} skipped, {} via render fallback",
            site.host(),
            pages.len(),
            failed.len(),
            skipped,
            fallback_count
        );

        Ok(CrawlReport {
            pages,
            failed,
            skipped,
            sitemap_valid: discovery.sitemap_valid,
            fallback_count,
        })
    }

    /// Processes frontier batches until it empties or the page cap is hit
    async fn drain(
        &self,
        site: &SiteRoot,
        options: &CrawlOptions,
        discovery: &Discovery,
        fetcher: &Fetcher,
        frontier: &mut Frontier,
        delay: Duration,
    ) -> Result<Vec<PageRecord>, SyncError> {
        let normalize = options.normalize_options();
        let mut pages: Vec<PageRecord> = Vec::new();
        let mut batch_number = 0;

        while pages.len() < options.max_pages {
            let limit = options.concurrency.min(options.max_pages - pages.len());
            let batch = frontier.next_batch(limit);
            if batch.is_empty() {
                break;
            }
            batch_number += 1;

            let tasks = batch
                .iter()
                .map(|url| process_url(url, site, discovery, fetcher, normalize));
            let results = join_all(tasks).await;

            for (url, result) in batch.iter().zip(results) {
                match result {
                    Ok((record, candidates)) => {
                        for candidate in &candidates {
                            frontier.offer(candidate);
                        }
                        frontier.mark_stored(url);
                        pages.push(record);
                    }
                    Err(e) if e.is_fatal() => {
                        tracing::error!("Aborting crawl of {}: {}", site.host(), e);
                        return Err(SyncError::CrawlFatal(e.to_string()));
                    }
                    Err(e) => {
                        let failure = SyncError::FetchFailed {
                            url: url.clone(),
                            reason: e.to_string(),
                        };
                        tracing::warn!("{}", failure);
                        frontier.mark_failed(url);
                    }
                }
            }

            tracing::info!(
                "Batch {}: {} pages collected, {} queued",
                batch_number,
                pages.len(),
                frontier.queued_len()
            );

            if !frontier.is_empty() && pages.len() < options.max_pages && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        if !frontier.is_empty() {
            tracing::info!(
                "Page cap of {} reached, abandoning {} queued URLs",
                options.max_pages,
                frontier.queued_len()
            );
        }

        Ok(pages)
    }
}

/// Fetches one URL and extracts its record plus its follow candidates
async fn process_url(
    url: &str,
    site: &SiteRoot,
    discovery: &Discovery,
    fetcher: &Fetcher,
    normalize: NormalizeOptions,
) -> Result<(PageRecord, Vec<String>), FetchError> {
    let page_url = Url::parse(url).map_err(|e| FetchError::Network(e.to_string()))?;
    let page = fetcher.fetch_page(url).await?;

    // Links resolve against the served URL; the record keeps the frontier key
    let parsed = parse_html(page.html(), &page.final_url, normalize);
    let candidates = parsed.links.clone();
    let record = parsed.into_record(
        &page_url,
        site,
        discovery.sitemap_entries.get(url),
        page.last_modified,
        page.used_fallback(),
    );

    tracing::trace!(
        "Extracted {} ({} links, fallback: {})",
        url,
        record.links.len(),
        record.used_fallback
    );
    Ok((record, candidates))
}
