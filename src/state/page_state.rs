/// Page state definitions for tracking a URL through one crawl run
///
/// ```text
/// Discovered -> Queued -> Fetching -> Stored
///                                  \-> Failed
/// ```
use std::fmt;

/// Represents the current state of a URL in a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    /// URL has been seen but not yet placed on the frontier
    Discovered,

    /// URL is on the frontier waiting to be fetched
    Queued,

    /// URL is being fetched and extracted by a batch task
    Fetching,

    /// Page record was collected into the crawl result
    Stored,

    /// Both fetch tiers failed for this URL
    Failed,
}

impl PageState {
    /// Returns true if the transition `self -> next` is part of the state machine
    ///
    /// `Stored` and `Failed` have no exits.
    pub fn can_transition_to(&self, next: PageState) -> bool {
        matches!(
            (self, next),
            (Self::Discovered, Self::Queued)
                | (Self::Queued, Self::Fetching)
                | (Self::Fetching, Self::Stored)
                | (Self::Fetching, Self::Failed)
        )
    }

    /// Converts the page state to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Stored => "stored",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
