//! Storage module for the page inventory
//!
//! This module handles persistence of crawl results, including:
//! - The `PageStore` interface consumed by the reconciler
//! - A SQLite implementation of that interface
//! - Sync status and crawl summary bookkeeping
//! - The batch writer that upserts crawl output in bounded chunks

mod schema;
mod sqlite;
mod traits;
mod writer;

pub use schema::initialize_schema;
pub use sqlite::SqliteStore;
pub use traits::{PageStore, StoreError, StoreResult};
pub use writer::{BatchWriter, WriteReport};

use crate::discovery::ChangeFrequency;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Structured metadata for one fetched page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    /// Canonical URL
    pub url: String,
    pub domain: String,
    /// Page title; empty when the page declares none
    pub title: String,
    pub description: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub change_frequency: Option<ChangeFrequency>,
    /// Sitemap priority in `[0, 1]`
    pub priority: Option<f32>,
    /// Same-site outbound links, normalized, in document order without duplicates
    pub links: Vec<String>,
    /// HTML came from the headless render tier
    pub used_fallback: bool,
}

/// Per-page sync status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Synced,
    Removed,
}

impl SyncStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::Removed => "removed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "synced" => Some(Self::Synced),
            "removed" => Some(Self::Removed),
            _ => None,
        }
    }
}

/// A page as previously stored for a user
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPage {
    pub url: String,
    pub domain: String,
    pub title: String,
    pub last_modified: Option<DateTime<Utc>>,
    /// `None` for rows written but never reconciled
    pub sync_status: Option<SyncStatus>,
    pub last_sync: Option<DateTime<Utc>>,
    pub sitemap_discovered: bool,
}

/// Outcome of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Per-site summary of the latest crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlSummary {
    pub page_count: usize,
    pub sitemap_valid: bool,
    pub status: RunStatus,
}

impl CrawlSummary {
    /// Summary recorded when a run aborts
    pub fn failed() -> Self {
        Self {
            page_count: 0,
            sitemap_valid: false,
            status: RunStatus::Failed,
        }
    }
}
