//! SQLite page store
//!
//! This module provides a SQLite-based implementation of the PageStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PageStore, StoreError, StoreResult};
use crate::storage::{CrawlSummary, PageRecord, RunStatus, StoredPage, SyncStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const PAGE_COLUMNS: &str =
    "url, domain, title, last_modified, sync_status, last_sync, sitemap_discovered";

/// SQLite store backend
///
/// The connection sits behind a mutex; every call is a short synchronous
/// statement so the lock is never held across an await.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates a store at the given path
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StoreError)` - Failed to open database
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory store
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Lock)
    }

    /// Gets one stored page regardless of how it was discovered
    pub fn get_page(&self, user_id: &str, url: &str) -> StoreResult<Option<StoredPage>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM pages WHERE user_id = ?1 AND url = ?2",
            PAGE_COLUMNS
        ))?;

        let page = stmt
            .query_row(params![user_id, url], stored_page_from_row)
            .optional()?;
        Ok(page)
    }

    /// Counts the pages stored for a user
    pub fn count_pages(&self, user_id: &str) -> StoreResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Gets the stored outbound links of a page
    pub fn get_links(&self, user_id: &str, url: &str) -> StoreResult<Vec<String>> {
        let conn = self.lock()?;
        let links: Option<String> = conn
            .query_row(
                "SELECT links FROM pages WHERE user_id = ?1 AND url = ?2",
                params![user_id, url],
                |row| row.get(0),
            )
            .optional()?;

        match links {
            Some(json) => {
                serde_json::from_str(&json).map_err(|e| StoreError::Serialization(e.to_string()))
            }
            None => Err(StoreError::PageNotFound(url.to_string())),
        }
    }
}

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|t| t.with_timezone(&Utc))
}

fn stored_page_from_row(row: &Row<'_>) -> rusqlite::Result<StoredPage> {
    Ok(StoredPage {
        url: row.get(0)?,
        domain: row.get(1)?,
        title: row.get(2)?,
        last_modified: parse_timestamp(row.get(3)?),
        sync_status: row
            .get::<_, Option<String>>(4)?
            .and_then(|s| SyncStatus::from_db_string(&s)),
        last_sync: parse_timestamp(row.get(5)?),
        sitemap_discovered: row.get(6)?,
    })
}

#[async_trait]
impl PageStore for SqliteStore {
    async fn get_discovered_pages(&self, user_id: &str) -> StoreResult<Vec<StoredPage>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM pages WHERE user_id = ?1 AND sitemap_discovered = 1",
            PAGE_COLUMNS
        ))?;

        let pages = stmt
            .query_map(params![user_id], stored_page_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pages)
    }

    async fn upsert_pages(&self, user_id: &str, pages: &[PageRecord]) -> StoreResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO pages (user_id, url, domain, title, description, last_modified,
                 change_frequency, priority, links, used_fallback, sitemap_discovered, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1, ?11)
                 ON CONFLICT(user_id, url) DO UPDATE SET
                    domain = excluded.domain,
                    title = excluded.title,
                    description = excluded.description,
                    last_modified = excluded.last_modified,
                    change_frequency = excluded.change_frequency,
                    priority = excluded.priority,
                    links = excluded.links,
                    used_fallback = excluded.used_fallback,
                    sitemap_discovered = 1,
                    updated_at = excluded.updated_at",
            )?;

            for page in pages {
                let links = serde_json::to_string(&page.links)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                stmt.execute(params![
                    user_id,
                    page.url,
                    page.domain,
                    page.title,
                    page.description,
                    page.last_modified.map(|t| t.to_rfc3339()),
                    page.change_frequency.map(|f| f.as_str()),
                    page.priority,
                    links,
                    page.used_fallback,
                    now,
                ])?;
            }
        }

        tx.commit()?;
        Ok(pages.len())
    }

    async fn update_sync_status(
        &self,
        url: &str,
        user_id: &str,
        status: SyncStatus,
        timestamp: DateTime<Utc>,
    ) -> StoreResult<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE pages SET sync_status = ?1, last_sync = ?2 WHERE user_id = ?3 AND url = ?4",
            params![status.to_db_string(), timestamp.to_rfc3339(), user_id, url],
        )?;

        if updated == 0 {
            return Err(StoreError::PageNotFound(url.to_string()));
        }
        Ok(())
    }

    async fn update_crawl_summary(
        &self,
        user_id: &str,
        domain: &str,
        summary: &CrawlSummary,
    ) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO crawl_summaries
             (user_id, domain, page_count, sitemap_valid, status, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id,
                domain,
                summary.page_count as i64,
                summary.sitemap_valid,
                summary.status.to_db_string(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn get_crawl_summary(
        &self,
        user_id: &str,
        domain: &str,
    ) -> StoreResult<Option<CrawlSummary>> {
        let conn = self.lock()?;
        let summary = conn
            .query_row(
                "SELECT page_count, sitemap_valid, status FROM crawl_summaries
                 WHERE user_id = ?1 AND domain = ?2",
                params![user_id, domain],
                |row| {
                    Ok(CrawlSummary {
                        page_count: row.get::<_, i64>(0)? as usize,
                        sitemap_valid: row.get(1)?,
                        status: RunStatus::from_db_string(&row.get::<_, String>(2)?)
                            .unwrap_or(RunStatus::Failed),
                    })
                },
            )
            .optional()?;
        Ok(summary)
    }
}
