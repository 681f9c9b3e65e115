//! Batched persistence of crawl output

use crate::storage::{PageRecord, PageStore};
use std::sync::Arc;

/// Outcome of one `store_batch` call
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteReport {
    /// URLs of every page in a batch that was written
    pub written_urls: Vec<String>,
    /// URLs of every page in a batch that failed
    pub failed_urls: Vec<String>,
    /// One message per failed batch
    pub errors: Vec<String>,
}

impl WriteReport {
    pub fn written(&self) -> usize {
        self.written_urls.len()
    }
}

/// Upserts page records in fixed-size batches
///
/// A failed batch is logged and skipped; later batches still run.
pub struct BatchWriter {
    store: Arc<dyn PageStore>,
    batch_size: usize,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn PageStore>, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Writes pages for a user, one batch at a time
    pub async fn store_batch(&self, user_id: &str, pages: &[PageRecord]) -> WriteReport {
        let mut report = WriteReport::default();
        let total_batches = pages.len().div_ceil(self.batch_size);

        for (index, batch) in pages.chunks(self.batch_size).enumerate() {
            let urls = batch.iter().map(|p| p.url.clone());
            match self.store.upsert_pages(user_id, batch).await {
                Ok(_) => {
                    tracing::debug!(
                        "Stored batch {}/{} ({} pages)",
                        index + 1,
                        total_batches,
                        batch.len()
                    );
                    report.written_urls.extend(urls);
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to store batch {}/{} ({} pages): {}",
                        index + 1,
                        total_batches,
                        batch.len(),
                        e
                    );
                    report.failed_urls.extend(urls);
                    report
                        .errors
                        .push(format!("batch {}/{}: {}", index + 1, total_batches, e));
                }
            }
        }

        report
    }
}
