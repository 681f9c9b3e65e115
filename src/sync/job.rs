//! Fire-and-forget sync jobs
//!
//! A job request is acknowledged immediately; the reconciliation itself runs
//! on a spawned task and reports only through logs and the store.

use crate::crawler::CrawlOverrides;
use crate::sync::Reconciler;
use crate::SyncError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Request to sync one user's site
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncJobRequest {
    pub domain: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_external_links: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_query_params: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_patterns: Option<Vec<String>>,
}

impl SyncJobRequest {
    pub fn new(domain: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            user_id: user_id.into(),
            max_pages: None,
            follow_external_links: None,
            ignore_query_params: None,
            exclude_patterns: None,
        }
    }

    pub fn overrides(&self) -> CrawlOverrides {
        CrawlOverrides {
            max_pages: self.max_pages,
            follow_external_links: self.follow_external_links,
            ignore_query_params: self.ignore_query_params,
            exclude_patterns: self.exclude_patterns.clone(),
        }
    }
}

/// Immediate answer to a job request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAck {
    pub status: String,
    pub domain: String,
    pub user_id: String,
}

/// Starts a sync in the background and acknowledges it
///
/// Overrides are checked before anything is spawned; an unusable request is
/// refused with `SyncError::Config`. Past that point the acknowledgement does
/// not depend on the outcome, and failures are logged when the task finishes.
pub fn spawn_sync_job(
    reconciler: Arc<Reconciler>,
    request: SyncJobRequest,
) -> Result<(JobAck, JoinHandle<()>), SyncError> {
    let options = reconciler.options().clone().with_overrides(&request.overrides());
    options.validate()?;

    let ack = JobAck {
        status: "processing".to_string(),
        domain: request.domain.clone(),
        user_id: request.user_id.clone(),
    };

    let handle = tokio::spawn(async move {
        tracing::info!("Sync job started for {} ({})", request.domain, request.user_id);
        match reconciler
            .sync_with_options(&request.domain, &request.user_id, &options)
            .await
        {
            Ok(result) => tracing::info!(
                "Sync job for {} done: {} added, {} updated, {} removed",
                request.domain,
                result.added,
                result.updated,
                result.removed
            ),
            Err(e) => tracing::error!("Sync job for {} failed: {}", request.domain, e),
        }
    });

    Ok((ack, handle))
}
