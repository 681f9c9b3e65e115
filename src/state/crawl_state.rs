use crate::state::PageState;
use std::collections::{HashSet, VecDeque};

/// Run-scoped bookkeeping for one crawl
///
/// Created at run start and dropped at run end; nothing here outlives a run.
/// Invariant: `discovered ⊇ queued ∪ visited`, and a URL enters `queued` at
/// most once because admission checks `discovered` first.
#[derive(Debug, Default)]
pub struct CrawlState {
    /// Every URL ever admitted or rejected by the frontier
    discovered: HashSet<String>,

    /// FIFO frontier
    queued: VecDeque<String>,

    /// URLs handed to a fetch task
    visited: HashSet<String>,

    /// URLs whose page record was collected
    stored: HashSet<String>,

    /// URLs whose fetch failed on every tier
    failed: Vec<String>,
}

impl CrawlState {
    /// Creates an empty crawl state
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a URL as seen without queueing it
    ///
    /// Returns false if the URL was already known.
    pub fn mark_seen(&mut self, url: &str) -> bool {
        self.discovered.insert(url.to_string())
    }

    /// Appends a URL to the frontier unless it was seen before
    ///
    /// Returns true if the URL was queued.
    pub fn enqueue(&mut self, url: &str) -> bool {
        if !self.discovered.insert(url.to_string()) {
            return false;
        }
        self.queued.push_back(url.to_string());
        true
    }

    /// Pops up to `limit` URLs that have not been visited, marking them visited
    pub fn next_batch(&mut self, limit: usize) -> Vec<String> {
        let mut batch = Vec::with_capacity(limit);
        while batch.len() < limit {
            let Some(url) = self.queued.pop_front() else {
                break;
            };
            if self.visited.insert(url.clone()) {
                batch.push(url);
            }
        }
        batch
    }

    /// Records a permanent failure for a URL being fetched
    ///
    /// Returns false, changing nothing, when the URL is not `Fetching`.
    pub fn mark_failed(&mut self, url: &str) -> bool {
        if !self.can_move(url, PageState::Failed) {
            return false;
        }
        self.failed.push(url.to_string());
        true
    }

    /// Records that a URL being fetched produced a page record
    ///
    /// Returns false, changing nothing, when the URL is not `Fetching`.
    pub fn mark_stored(&mut self, url: &str) -> bool {
        if !self.can_move(url, PageState::Stored) {
            return false;
        }
        self.stored.insert(url.to_string());
        true
    }

    fn can_move(&self, url: &str, next: PageState) -> bool {
        let current = self.state_of(url);
        let allowed = current.is_some_and(|state| state.can_transition_to(next));
        if !allowed {
            tracing::debug!("Ignoring {:?} -> {} for {}", current, next, url);
        }
        allowed
    }

    /// Current state of a URL in this run, if it was ever seen
    ///
    /// A visited URL without an outcome is reported as `Fetching`.
    pub fn state_of(&self, url: &str) -> Option<PageState> {
        if self.stored.contains(url) {
            Some(PageState::Stored)
        } else if self.failed.iter().any(|f| f == url) {
            Some(PageState::Failed)
        } else if self.visited.contains(url) {
            Some(PageState::Fetching)
        } else if self.queued.iter().any(|q| q == url) {
            Some(PageState::Queued)
        } else if self.discovered.contains(url) {
            Some(PageState::Discovered)
        } else {
            None
        }
    }

    /// Returns true if the URL has been admitted or rejected before
    pub fn is_discovered(&self, url: &str) -> bool {
        self.discovered.contains(url)
    }

    /// Returns true if the URL was handed to a fetch task
    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Returns true if no URLs are waiting
    pub fn is_frontier_empty(&self) -> bool {
        self.queued.is_empty()
    }

    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    pub fn discovered_len(&self) -> usize {
        self.discovered.len()
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    pub fn stored_len(&self) -> usize {
        self.stored.len()
    }

    /// URLs that failed permanently, in failure order
    pub fn failed(&self) -> &[String] {
        &self.failed
    }

    /// Consumes the state, returning the failed URLs
    pub fn into_failed(self) -> Vec<String> {
        self.failed
    }
}
