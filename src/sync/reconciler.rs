//! Reconciliation of a fresh crawl against the stored page inventory

use crate::config::Config;
use crate::crawler::{Coordinator, CrawlOptions};
use crate::storage::{
    BatchWriter, CrawlSummary, PageRecord, PageStore, RunStatus, StoredPage, SyncStatus,
};
use crate::url::SiteRoot;
use crate::SyncError;
use chrono::Utc;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Counts of one reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    /// One message per failed store call
    pub errors: Vec<String>,
}

/// How every URL of `existing ∪ fresh` is to be treated
///
/// Each existing URL lands in exactly one of `updated`, `unchanged`, `removed`;
/// each fresh URL in exactly one of `added`, `updated`, `unchanged`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    /// Fresh pages with no stored row
    pub added: Vec<PageRecord>,
    /// Fresh pages whose `lastModified` changed, or that were marked removed
    pub updated: Vec<PageRecord>,
    /// URLs present on both sides with nothing to do, plus removed pages
    /// still absent
    pub unchanged: Vec<String>,
    /// Stored URLs missing from the fresh crawl
    pub removed: Vec<String>,
}

/// Classifies fresh pages against the stored ones
pub fn plan_reconciliation(
    existing: &HashMap<String, StoredPage>,
    fresh: &[PageRecord],
) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for page in fresh {
        if !seen.insert(page.url.as_str()) {
            continue;
        }
        match existing.get(&page.url) {
            None => plan.added.push(page.clone()),
            Some(stored)
                if stored.sync_status == Some(SyncStatus::Removed)
                    || stored.last_modified != page.last_modified =>
            {
                plan.updated.push(page.clone())
            }
            Some(_) => plan.unchanged.push(page.url.clone()),
        }
    }

    for (url, stored) in existing {
        if seen.contains(url.as_str()) {
            continue;
        }
        if stored.sync_status == Some(SyncStatus::Removed) {
            plan.unchanged.push(url.clone());
        } else {
            plan.removed.push(url.clone());
        }
    }

    plan.removed.sort();
    plan
}

/// Keeps a user's stored inventory of a site in step with the live site
pub struct Reconciler {
    store: Arc<dyn PageStore>,
    coordinator: Arc<Coordinator>,
    writer: BatchWriter,
    options: CrawlOptions,
}

impl Reconciler {
    /// Creates a reconciler with a Chromium-backed coordinator
    pub fn new(config: &Config, store: Arc<dyn PageStore>) -> Result<Self, SyncError> {
        let coordinator = Coordinator::new(config)?;
        Ok(Self::with_coordinator(config, store, coordinator))
    }

    /// Creates a reconciler around an existing coordinator
    pub fn with_coordinator(
        config: &Config,
        store: Arc<dyn PageStore>,
        coordinator: Coordinator,
    ) -> Self {
        Self {
            writer: BatchWriter::new(store.clone(), config.sync.write_batch_size),
            store,
            coordinator: Arc::new(coordinator),
            options: CrawlOptions::from_config(&config.crawler).with_max_pages(config.sync.max_pages),
        }
    }

    pub fn with_options(mut self, options: CrawlOptions) -> Self {
        self.options = options;
        self
    }

    /// Default crawl options of a sync
    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    /// Reconciles a site with the default options
    pub async fn sync(&self, domain: &str, user_id: &str) -> Result<SyncResult, SyncError> {
        self.sync_with_options(domain, user_id, &self.options).await
    }

    /// Reconciles a site
    ///
    /// # Process
    ///
    /// 1. Load the user's sitemap-discovered pages for the site
    /// 2. Crawl the site
    /// 3. Upsert added and updated pages, then mark them `synced`
    /// 4. Mark stored pages missing from the crawl `removed`
    /// 5. Record the crawl summary
    ///
    /// Store failures past step 1 are collected into `errors`; counts only
    /// include rows whose status was written. A fatal crawl error records a
    /// failed summary and is returned.
    pub async fn sync_with_options(
        &self,
        domain: &str,
        user_id: &str,
        options: &CrawlOptions,
    ) -> Result<SyncResult, SyncError> {
        let site = SiteRoot::parse(domain)?;

        let existing: HashMap<String, StoredPage> = self
            .store
            .get_discovered_pages(user_id)
            .await?
            .into_iter()
            .filter(|page| page.domain == site.host() || site.contains(&page.url))
            .map(|page| (page.url.clone(), page))
            .collect();
        tracing::info!(
            "Syncing {} for user {} ({} stored pages)",
            site.host(),
            user_id,
            existing.len()
        );

        let report = match self.coordinator.crawl(&site, options).await {
            Ok(report) => report,
            Err(e) => {
                if matches!(e, SyncError::CrawlFatal(_)) {
                    self.record_failed_run(user_id, site.host()).await;
                }
                return Err(e);
            }
        };

        let plan = plan_reconciliation(&existing, &report.pages);
        let mut result = SyncResult::default();
        let now = Utc::now();

        let to_write: Vec<PageRecord> = plan
            .added
            .iter()
            .chain(plan.updated.iter())
            .cloned()
            .collect();
        let write_report = self.writer.store_batch(user_id, &to_write).await;
        result.errors.extend(write_report.errors);
        let written: HashSet<&str> = write_report
            .written_urls
            .iter()
            .map(String::as_str)
            .collect();

        for page in plan.added.iter().filter(|p| written.contains(p.url.as_str())) {
            if self
                .mark(&page.url, user_id, SyncStatus::Synced, now, &mut result.errors)
                .await
            {
                result.added += 1;
            }
        }
        for page in plan.updated.iter().filter(|p| written.contains(p.url.as_str())) {
            if self
                .mark(&page.url, user_id, SyncStatus::Synced, now, &mut result.errors)
                .await
            {
                result.updated += 1;
            }
        }
        for url in &plan.removed {
            if self
                .mark(url, user_id, SyncStatus::Removed, now, &mut result.errors)
                .await
            {
                result.removed += 1;
            }
        }

        // Rows written by a plain crawl have never been given a status
        for url in &plan.unchanged {
            if existing.get(url).is_some_and(|p| p.sync_status.is_none()) {
                self.mark(url, user_id, SyncStatus::Synced, now, &mut result.errors)
                    .await;
            }
        }

        let summary = CrawlSummary {
            page_count: report.pages.len(),
            sitemap_valid: report.sitemap_valid,
            status: RunStatus::Completed,
        };
        if let Err(e) = self
            .store
            .update_crawl_summary(user_id, site.host(), &summary)
            .await
        {
            result.errors.push(format!("crawl summary: {}", e));
        }

        tracing::info!(
            "Sync of {} complete: {} added, {} updated, {} removed, {} unchanged, {} errors",
            site.host(),
            result.added,
            result.updated,
            result.removed,
            plan.unchanged.len(),
            result.errors.len()
        );

        Ok(result)
    }

    /// Writes one sync status, recording a failure message instead of failing
    async fn mark(
        &self,
        url: &str,
        user_id: &str,
        status: SyncStatus,
        now: chrono::DateTime<Utc>,
        errors: &mut Vec<String>,
    ) -> bool {
        match self.store.update_sync_status(url, user_id, status, now).await {
            Ok(()) => true,
            Err(e) => {
                let failure = SyncError::StoreWriteFailed(e);
                tracing::warn!("{} ({})", failure, url);
                errors.push(format!("{}: {}", url, failure));
                false
            }
        }
    }

    async fn record_failed_run(&self, user_id: &str, domain: &str) {
        if let Err(e) = self
            .store
            .update_crawl_summary(user_id, domain, &CrawlSummary::failed())
            .await
        {
            tracing::error!("Failed to record failed crawl of {}: {}", domain, e);
        }
    }
}
