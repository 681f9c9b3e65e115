//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageState`: the per-URL state machine (discovered, queued, fetching, stored, failed)
//! - `CrawlState`: run-scoped sets that only move URLs along `PageState` transitions

mod crawl_state;
mod page_state;

pub use crawl_state::CrawlState;
pub use page_state::PageState;
