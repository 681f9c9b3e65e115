//! Page store interface and error types
//!
//! This module defines the trait the reconciler and batch writer consume.
//! Every call is individually fallible; callers must not assume atomicity
//! across calls.

use crate::storage::{CrawlSummary, PageRecord, StoredPage, SyncStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Store lock poisoned")]
    Lock,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable page inventory, scoped per user
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Gets every sitemap-discovered page stored for a user
    async fn get_discovered_pages(&self, user_id: &str) -> StoreResult<Vec<StoredPage>>;

    /// Inserts or updates a batch of page records
    ///
    /// Existing rows keep their sync status; only page metadata changes.
    ///
    /// # Returns
    ///
    /// The number of rows written
    async fn upsert_pages(&self, user_id: &str, pages: &[PageRecord]) -> StoreResult<usize>;

    /// Sets the sync status of one stored page
    ///
    /// Fails with `PageNotFound` if the user has no row for the URL.
    async fn update_sync_status(
        &self,
        url: &str,
        user_id: &str,
        status: SyncStatus,
        timestamp: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Records the summary of the latest crawl of a site
    async fn update_crawl_summary(
        &self,
        user_id: &str,
        domain: &str,
        summary: &CrawlSummary,
    ) -> StoreResult<()>;

    /// Gets the summary of the latest crawl of a site
    async fn get_crawl_summary(
        &self,
        user_id: &str,
        domain: &str,
    ) -> StoreResult<Option<CrawlSummary>>;
}
