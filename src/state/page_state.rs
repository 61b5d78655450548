/// Page state definitions for tracking crawl progress
///
/// A URL moves `Unseen -> Enqueued -> Fetching -> {Extracted | FetchFailed}`
/// within one session and never goes backwards.
use std::fmt;

/// Represents the current state of a page in the crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    /// Not yet known to the frontier
    Unseen,

    /// Admitted to the visited set and waiting for its depth batch
    Enqueued,

    /// A worker is fetching the page
    Fetching,

    /// Fetched and extracted; contributed to the aggregate
    Extracted,

    /// Both transports failed; contributes nothing and is never retried
    FetchFailed,
}

impl PageState {
    /// Returns true if the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: PageState) -> bool {
        matches!(
            (self, next),
            (Self::Unseen, Self::Enqueued)
                | (Self::Enqueued, Self::Fetching)
                | (Self::Fetching, Self::Extracted)
                | (Self::Fetching, Self::FetchFailed)
        )
    }

    /// Short lowercase name used in logs and metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unseen => "unseen",
            Self::Enqueued => "enqueued",
            Self::Fetching => "fetching",
            Self::Extracted => "extracted",
            Self::FetchFailed => "fetch_failed",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
