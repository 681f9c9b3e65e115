//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Two-tier fetching (static HTTP, headless render fallback)
//! - The headless session pool and its browser backend
//! - HTML extraction of metadata and links
//! - Frontier admission and overall crawl coordination

mod browser;
mod coordinator;
mod extractor;
mod fetcher;
mod frontier;
mod pool;

pub use browser::{ChromiumBackend, ChromiumSession};
pub use coordinator::{Coordinator, CrawlOptions, CrawlOverrides, CrawlReport};
pub use extractor::{extract, parse_html, ParsedPage};
pub use fetcher::{
    build_http_client, parse_http_date, FetchError, FetchedHtml, FetchedPage, Fetcher, Renderer,
};
pub use frontier::{Admission, Frontier, SkipReason};
pub use pool::{BrowserBackend, PooledSession, RenderSession, SessionPool};
