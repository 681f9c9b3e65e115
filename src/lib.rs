//! Site-Sync: site discovery and crawl synchronization
//!
//! This crate discovers a tracked site's URL set (robots.txt, sitemaps and
//! link-following), fetches pages under bounded concurrency with a static
//! fetch tier and a headless-render fallback, extracts page metadata, and
//! reconciles every crawl against the previously stored page inventory.

pub mod config;
pub mod crawler;
pub mod discovery;
pub mod state;
pub mod storage;
pub mod sync;
pub mod url;

use thiserror::Error;

/// Main error type for Site-Sync operations
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A single robots/sitemap candidate could not be used
    #[error("Discovery probe failed for {url}: {reason}")]
    DiscoveryProbeFailed { url: String, reason: String },

    /// Both fetch tiers were exhausted for a URL
    #[error("Fetch failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Store write failed: {0}")]
    StoreWriteFailed(#[from] storage::StoreError),

    /// Resource-level failure that prevents any further progress
    #[error("Crawl aborted: {0}")]
    CrawlFatal(String),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid exclude pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("URL points at a binary asset: {0}")]
    BinaryAsset(String),
}

/// Result type alias for Site-Sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlOptions, CrawlReport};
pub use state::{CrawlState, PageState};
pub use storage::{PageRecord, PageStore, SqliteStore, SyncStatus};
pub use sync::{Reconciler, SyncResult};
pub use url::{normalize_url, SiteRoot};
