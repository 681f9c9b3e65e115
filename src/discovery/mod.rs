//! Seed discovery from robots.txt and sitemaps
//!
//! Discovery never fails a run: every unreachable or malformed candidate is
//! logged and skipped, and a site without a usable sitemap is crawled from
//! its homepage.

mod robots;
mod sitemap;

pub use robots::ParsedRobots;
pub use sitemap::{parse_sitemap, ChangeFrequency, SitemapDocument, SitemapEntry};

use crate::url::{normalize_url_with, NormalizeOptions, SiteRoot};
use crate::SyncError;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use reqwest::Client;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// Conventional sitemap locations probed on every site
pub const SITEMAP_PATHS: &[&str] = &[
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/wp-sitemap.xml",
    "/sitemap-index.xml",
    "/sitemaps.xml",
    "/sitemap1.xml",
    "/post-sitemap.xml",
    "/page-sitemap.xml",
];

/// Nested sitemap indexes deeper than this are not followed
pub const MAX_INDEX_DEPTH: usize = 3;

/// Result of discovery for one site
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Normalized same-site URLs to seed the frontier with
    pub seed_urls: BTreeSet<String>,

    /// Sitemap metadata keyed by normalized URL
    pub sitemap_entries: HashMap<String, SitemapEntry>,

    /// At least one sitemap candidate yielded a URL
    pub sitemap_valid: bool,

    /// Parsed robots.txt, if the site served one
    pub robots: Option<ParsedRobots>,
}

/// Resolves seed URLs for a site
pub struct Discoverer {
    client: Client,
    probe_timeout: Duration,
    normalize: NormalizeOptions,
}

impl Discoverer {
    /// Creates a discoverer that uses the given client for all probes
    pub fn new(client: Client, probe_timeout: Duration) -> Self {
        Self {
            client,
            probe_timeout,
            normalize: NormalizeOptions::default(),
        }
    }

    /// Sets the normalization applied to sitemap URLs
    pub fn with_normalize_options(mut self, options: NormalizeOptions) -> Self {
        self.normalize = options;
        self
    }

    /// Discovers seed URLs for a site
    ///
    /// # Process
    ///
    /// 1. Fetch robots.txt and collect its `Sitemap:` directives
    /// 2. Add the conventional sitemap paths
    /// 3. Probe every candidate concurrently, recursing into indexes
    /// 4. Merge normalized same-site URLs into the seed set
    ///
    /// Falls back to the homepage when no sitemap yields a URL.
    pub async fn discover(&self, site: &SiteRoot) -> Discovery {
        let robots = self.fetch_robots(site).await;

        let candidates = sitemap_candidates(site, robots.as_ref());
        tracing::debug!(
            "Probing {} sitemap candidates for {}",
            candidates.len(),
            site.host()
        );

        let fetched = Mutex::new(HashSet::new());
        let probes = candidates
            .into_iter()
            .map(|candidate| self.resolve_sitemap(candidate, 0, &fetched));
        let results = join_all(probes).await;

        let mut discovery = Discovery {
            robots,
            ..Discovery::default()
        };

        for entry in results.into_iter().flatten() {
            let Some(url) = normalize_url_with(&entry.url, self.normalize) else {
                continue;
            };
            if !site.contains(&url) {
                tracing::trace!("Ignoring off-site sitemap URL {}", url);
                continue;
            }

            discovery.sitemap_valid = true;
            discovery.seed_urls.insert(url.clone());
            discovery.sitemap_entries.entry(url).or_insert(entry);
        }

        if discovery.seed_urls.is_empty() {
            tracing::info!(
                "No sitemap URLs found for {}, crawling from the homepage",
                site.host()
            );
            if let Some(root) = normalize_url_with(&site.root_url(), self.normalize) {
                discovery.seed_urls.insert(root);
            }
        } else {
            tracing::info!(
                "Discovered {} sitemap URLs for {}",
                discovery.seed_urls.len(),
                site.host()
            );
        }

        discovery
    }

    /// Fetches robots.txt; absent or unreachable files yield `None`
    async fn fetch_robots(&self, site: &SiteRoot) -> Option<ParsedRobots> {
        let robots_url = site.robots_url();
        match self.fetch_text(&robots_url).await {
            Ok(body) => Some(ParsedRobots::from_content(&body)),
            Err(e) => {
                tracing::debug!("{}", e);
                None
            }
        }
    }

    /// Fetches one sitemap and, for indexes, every nested sitemap
    ///
    /// `fetched` is shared by all probes of one discovery run so a sitemap
    /// referenced from several places is downloaded once.
    fn resolve_sitemap<'a>(
        &'a self,
        url: String,
        depth: usize,
        fetched: &'a Mutex<HashSet<String>>,
    ) -> BoxFuture<'a, Vec<SitemapEntry>> {
        async move {
            let first_visit = match fetched.lock() {
                Ok(mut seen) => seen.insert(url.clone()),
                Err(_) => false,
            };
            if !first_visit {
                return Vec::new();
            }

            match self.fetch_sitemap(&url).await {
                Ok(SitemapDocument::UrlSet(entries)) => {
                    tracing::debug!("Sitemap {} lists {} URLs", url, entries.len());
                    entries
                }
                Ok(SitemapDocument::Index(children)) => {
                    if depth >= MAX_INDEX_DEPTH {
                        tracing::warn!(
                            "Sitemap index {} nested too deeply, skipping {} children",
                            url,
                            children.len()
                        );
                        return Vec::new();
                    }
                    tracing::debug!("Sitemap index {} lists {} sitemaps", url, children.len());

                    let nested = children
                        .into_iter()
                        .map(|child| self.resolve_sitemap(child, depth + 1, fetched));
                    join_all(nested).await.into_iter().flatten().collect()
                }
                Ok(SitemapDocument::Empty) => Vec::new(),
                Err(e) => {
                    tracing::debug!("{}", e);
                    Vec::new()
                }
            }
        }
        .boxed()
    }

    async fn fetch_sitemap(&self, url: &str) -> Result<SitemapDocument, SyncError> {
        let body = self.fetch_text(url).await?;
        match parse_sitemap(body.as_bytes()) {
            SitemapDocument::Empty => Err(SyncError::DiscoveryProbeFailed {
                url: url.to_string(),
                reason: "not a sitemap".to_string(),
            }),
            doc => Ok(doc),
        }
    }

    /// GET with the probe timeout; non-2xx responses count as absent
    async fn fetch_text(&self, url: &str) -> Result<String, SyncError> {
        let probe_failed = |reason: String| SyncError::DiscoveryProbeFailed {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    probe_failed("timed out".to_string())
                } else {
                    probe_failed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(probe_failed(format!("HTTP {}", status.as_u16())));
        }

        response.text().await.map_err(|e| probe_failed(e.to_string()))
    }
}

/// Sitemaps declared in robots.txt first, then the conventional paths
fn sitemap_candidates(site: &SiteRoot, robots: Option<&ParsedRobots>) -> Vec<String> {
    let declared = robots.map(|r| r.sitemaps()).unwrap_or_default();
    let conventional = SITEMAP_PATHS.iter().filter_map(|path| site.join(path));

    let mut candidates: Vec<String> = Vec::new();
    for url in declared.into_iter().chain(conventional) {
        if !candidates.contains(&url) {
            candidates.push(url);
        }
    }
    candidates
}
