use serde::Deserialize;

/// Main configuration structure for Site-Sync
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Crawl frontier behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of pages collected by a plain crawl
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: usize,

    /// Number of URLs fetched in parallel per frontier batch
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Pause between frontier batches (milliseconds)
    #[serde(rename = "batch-delay-ms", default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Follow links that leave the tracked site
    #[serde(rename = "follow-external-links", default)]
    pub follow_external_links: bool,

    /// Drop query strings during URL normalization
    #[serde(rename = "ignore-query-params", default)]
    pub ignore_query_params: bool,

    /// Skip URLs disallowed by robots.txt
    #[serde(rename = "respect-robots", default = "default_true")]
    pub respect_robots: bool,

    /// Regular expressions matched against candidate URLs; matches are never fetched
    #[serde(rename = "exclude-patterns", default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            concurrency: default_concurrency(),
            batch_delay_ms: default_batch_delay_ms(),
            follow_external_links: false,
            ignore_query_params: false,
            respect_robots: true,
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

/// Fetch tier timeouts and headless pool sizing
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Abort timeout for the static HTTP tier (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Navigation timeout for the headless tier (seconds)
    #[serde(rename = "render-timeout-secs", default = "default_render_timeout")]
    pub render_timeout_secs: u64,

    /// Timeout for robots.txt and sitemap probes (seconds)
    #[serde(rename = "probe-timeout-secs", default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Retry failed static fetches through a headless browser
    #[serde(rename = "render-fallback", default = "default_true")]
    pub render_fallback: bool,

    /// Number of headless sessions kept warm
    #[serde(rename = "pool-size", default = "default_pool_size")]
    pub pool_size: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            render_timeout_secs: default_render_timeout(),
            probe_timeout_secs: default_probe_timeout(),
            render_fallback: true,
            pool_size: default_pool_size(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default = "default_contact_url")]
    pub contact_url: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: default_contact_url(),
        }
    }
}

impl UserAgentConfig {
    /// Browser-like user agent string shared by both fetch tiers
    pub fn user_agent_string(&self) -> String {
        format!(
            "Mozilla/5.0 (compatible; {}/{}; +{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }

    /// Token matched against robots.txt `User-agent` groups
    pub fn robots_token(&self) -> &str {
        &self.crawler_name
    }
}

/// Page store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Reconciliation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Page cap for the crawl behind a sync
    #[serde(rename = "max-pages", default = "default_sync_max_pages")]
    pub max_pages: usize,

    /// Rows per upsert batch
    #[serde(rename = "write-batch-size", default = "default_write_batch_size")]
    pub write_batch_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_pages: default_sync_max_pages(),
            write_batch_size: default_write_batch_size(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_pages() -> usize {
    100
}

fn default_concurrency() -> usize {
    5
}

fn default_batch_delay_ms() -> u64 {
    100
}

fn default_exclude_patterns() -> Vec<String> {
    [
        r"/wp-admin",
        r"/wp-login",
        r"/wp-json",
        r"/admin(/|$)",
        r"/cart(/|$)",
        r"/checkout(/|$)",
        r"/my-account",
        r"/login(/|$)",
        r"/logout(/|$)",
        r"/feed/?$",
        r"\.(xml|json|css|js|txt|csv|xls|xlsx|doc|docx|ppt|pptx)$",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

fn default_request_timeout() -> u64 {
    15
}

fn default_render_timeout() -> u64 {
    30
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_pool_size() -> usize {
    3
}

fn default_crawler_name() -> String {
    "SiteSync".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_contact_url() -> String {
    "https://example.com/bot".to_string()
}

fn default_database_path() -> String {
    "./site-sync.db".to_string()
}

fn default_sync_max_pages() -> usize {
    500
}

fn default_write_batch_size() -> usize {
    100
}
