//! Sync reconciliation
//!
//! Compares a fresh crawl with the stored page inventory of a user and
//! writes additions, changes and removals back to the store.

mod job;
mod reconciler;

pub use job::{spawn_sync_job, JobAck, SyncJobRequest};
pub use reconciler::{plan_reconciliation, ReconcilePlan, Reconciler, SyncResult};
