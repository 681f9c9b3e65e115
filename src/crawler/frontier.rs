//! Crawl frontier admission and batching
//!
//! This module decides which candidate URLs enter the FIFO queue:
//! - Normalization (invalid and binary URLs never enter)
//! - Same-site restriction unless external links are followed
//! - Exclude patterns
//! - robots.txt disallow rules
//!
//! Every admitted or rejected URL is remembered, so a URL is judged once and
//! fetched at most once per run.

use crate::discovery::ParsedRobots;
use crate::state::{CrawlState, PageState};
use crate::url::{parse_normalized, ExcludeMatcher, NormalizeOptions, SiteRoot};

/// Why a candidate was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Invalid,
    OffSite,
    Excluded,
    RobotsDisallowed,
}

/// Outcome of offering a URL to the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Appended to the queue under its normalized form
    Queued(String),
    /// Seen before in this run
    Duplicate,
    Skipped(SkipReason),
}

/// FIFO frontier over a run's `CrawlState`
pub struct Frontier {
    state: CrawlState,
    site: SiteRoot,
    matcher: ExcludeMatcher,
    robots: Option<(ParsedRobots, String)>,
    normalize: NormalizeOptions,
    follow_external: bool,
    skipped: usize,
}

impl Frontier {
    pub fn new(
        site: SiteRoot,
        matcher: ExcludeMatcher,
        normalize: NormalizeOptions,
        follow_external: bool,
    ) -> Self {
        Self {
            state: CrawlState::new(),
            site,
            matcher,
            robots: None,
            normalize,
            follow_external,
            skipped: 0,
        }
    }

    /// Applies robots.txt rules for `agent` to same-site candidates
    pub fn with_robots(mut self, robots: ParsedRobots, agent: &str) -> Self {
        self.robots = Some((robots, agent.to_string()));
        self
    }

    /// Offers a candidate URL
    pub fn offer(&mut self, raw: &str) -> Admission {
        let url = match parse_normalized(raw, self.normalize) {
            Ok(url) => url,
            Err(_) => return Admission::Skipped(SkipReason::Invalid),
        };
        let key = url.to_string();

        if self.state.is_discovered(&key) {
            return Admission::Duplicate;
        }

        let same_site = self.site.is_same_site(&url);
        let rejection = if !same_site && !self.follow_external {
            Some(SkipReason::OffSite)
        } else if self.matcher.is_excluded(&url) {
            Some(SkipReason::Excluded)
        } else if same_site && !self.robots_allow(&key) {
            Some(SkipReason::RobotsDisallowed)
        } else {
            None
        };

        match rejection {
            Some(reason) => {
                self.state.mark_seen(&key);
                if reason != SkipReason::OffSite {
                    self.skipped += 1;
                    tracing::debug!("Skipping {} ({:?})", key, reason);
                }
                Admission::Skipped(reason)
            }
            None => {
                self.state.enqueue(&key);
                Admission::Queued(key)
            }
        }
    }

    fn robots_allow(&self, url: &str) -> bool {
        match &self.robots {
            Some((robots, agent)) => robots.is_allowed(url, agent),
            None => true,
        }
    }

    /// Pops up to `limit` unvisited URLs and marks them visited
    pub fn next_batch(&mut self, limit: usize) -> Vec<String> {
        self.state.next_batch(limit)
    }

    pub fn mark_stored(&mut self, url: &str) {
        self.state.mark_stored(url);
    }

    pub fn mark_failed(&mut self, url: &str) {
        self.state.mark_failed(url);
    }

    pub fn state_of(&self, url: &str) -> Option<PageState> {
        self.state.state_of(url)
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_frontier_empty()
    }

    pub fn queued_len(&self) -> usize {
        self.state.queued_len()
    }

    pub fn visited_len(&self) -> usize {
        self.state.visited_len()
    }

    /// Candidates rejected by exclude patterns or robots.txt
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Consumes the frontier, returning the URLs that failed
    pub fn into_failed(self) -> Vec<String> {
        self.state.into_failed()
    }
}
