//! Crawl frontier for one session
//!
//! This module handles:
//! - The visited set, keyed by normalized URL
//! - Domain scoping and depth limits
//! - The frontier-wide page budget
//! - Per-URL state transitions
//!
//! The frontier is owned by the coordinating task; workers never touch it.
//! Admission inserts into the visited set and moves the URL to `Enqueued` in
//! one step, before any fetch for it can be spawned.

use crate::state::PageState;
use crate::url::{is_same_domain, normalize_parsed};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use tracing::debug;
use url::Url;

/// A URL waiting for its depth batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedUrl {
    /// Normalized URL to fetch
    pub url: Url,

    /// Link distance from the root
    pub depth: u32,
}

/// Why a URL was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Normalized form already enqueued or fetched
    AlreadyKnown,
    /// Deeper than the session's max depth
    DepthExceeded,
    /// Host (or port) differs from the base domain
    OffDomain,
    /// The page budget is used up
    BudgetExhausted,
    /// Not an HTTP(S) URL with a host
    Invalid,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AlreadyKnown => "already known",
            Self::DepthExceeded => "depth exceeded",
            Self::OffDomain => "off domain",
            Self::BudgetExhausted => "page budget exhausted",
            Self::Invalid => "invalid url",
        };
        f.write_str(s)
    }
}

/// Visited set plus the queue of admitted URLs
pub struct Frontier {
    base_domain: String,
    max_depth: u32,
    max_pages: usize,

    /// Every admitted URL and where it stands
    states: HashMap<String, PageState>,

    /// Admitted URLs not yet handed to a batch
    pending: VecDeque<QueuedUrl>,

    /// Links turned away because the budget ran out
    budget_rejections: usize,
}

impl Frontier {
    pub fn new(base_domain: impl Into<String>, max_depth: u32, max_pages: usize) -> Self {
        Self {
            base_domain: base_domain.into(),
            max_depth,
            max_pages,
            states: HashMap::new(),
            pending: VecDeque::new(),
            budget_rejections: 0,
        }
    }

    /// Admits a URL at `depth`, or says why it was skipped
    ///
    /// # Checks
    ///
    /// 1. Host and port must equal the base domain
    /// 2. `depth` must not exceed the max depth
    /// 3. The normalized form must not be known already
    /// 4. Fewer than `max_pages` URLs may have been admitted so far
    pub fn admit(&mut self, url: Url, depth: u32) -> Result<(), SkipReason> {
        let url = normalize_parsed(url).map_err(|_| SkipReason::Invalid)?;

        if !is_same_domain(&url, &self.base_domain) {
            return Err(SkipReason::OffDomain);
        }

        if depth > self.max_depth {
            return Err(SkipReason::DepthExceeded);
        }

        let key = url.to_string();
        if self.states.contains_key(&key) {
            return Err(SkipReason::AlreadyKnown);
        }

        if self.states.len() >= self.max_pages {
            self.budget_rejections += 1;
            return Err(SkipReason::BudgetExhausted);
        }

        self.states.insert(key, PageState::Enqueued);
        self.pending.push_back(QueuedUrl { url, depth });
        Ok(())
    }

    /// Removes and returns every pending URL
    ///
    /// Links found while a batch runs sit one level deeper, so each call
    /// yields exactly one depth level.
    pub fn take_batch(&mut self) -> Vec<QueuedUrl> {
        self.pending.drain(..).collect()
    }

    /// Moves a URL to `next` if the state machine allows it
    ///
    /// Returns false (and leaves the state untouched) otherwise.
    pub fn mark(&mut self, url: &Url, next: PageState) -> bool {
        let Some(state) = self.states.get_mut(url.as_str()) else {
            debug!("Ignoring state change for unknown URL {}", url);
            return false;
        };
        if !state.can_transition_to(next) {
            debug!("Rejected transition {} -> {} for {}", state, next, url);
            return false;
        }
        *state = next;
        true
    }

    /// Current state of a URL; unknown URLs are `Unseen`
    pub fn state(&self, url: &Url) -> PageState {
        normalize_parsed(url.clone())
            .ok()
            .and_then(|u| self.states.get(u.as_str()).copied())
            .unwrap_or(PageState::Unseen)
    }

    /// Number of URLs admitted this session
    pub fn visited_count(&self) -> usize {
        self.states.len()
    }

    /// Number of admitted URLs in `state`
    pub fn count_in(&self, state: PageState) -> usize {
        self.states.values().filter(|s| **s == state).count()
    }

    pub fn budget_rejections(&self) -> usize {
        self.budget_rejections
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn frontier() -> Frontier {
        Frontier::new("ex.com", 2, 100)
    }

    #[test]
    fn test_admit_root() {
        let mut f = frontier();
        assert!(f.admit(url("https://ex.com/"), 0).is_ok());
        assert_eq!(f.state(&url("https://ex.com")), PageState::Enqueued);
        assert_eq!(f.visited_count(), 1);
    }

    #[test]
    fn test_duplicate_normalized_form_rejected() {
        let mut f = frontier();
        f.admit(url("https://ex.com/a"), 1).unwrap();
        assert_eq!(
            f.admit(url("https://ex.com/a/#top"), 1),
            Err(SkipReason::AlreadyKnown)
        );
        assert_eq!(f.take_batch().len(), 1);
    }

    #[test]
    fn test_off_domain_rejected() {
        let mut f = frontier();
        assert_eq!(
            f.admit(url("https://other.com/b"), 1),
            Err(SkipReason::OffDomain)
        );
        assert_eq!(
            f.admit(url("https://www.ex.com/b"), 1),
            Err(SkipReason::OffDomain)
        );
        assert_eq!(f.visited_count(), 0);
    }

    #[test]
    fn test_depth_limit() {
        let mut f = frontier();
        assert!(f.admit(url("https://ex.com/two"), 2).is_ok());
        assert_eq!(
            f.admit(url("https://ex.com/three"), 3),
            Err(SkipReason::DepthExceeded)
        );
    }

    #[test]
    fn test_budget_counts_rejections() {
        let mut f = Frontier::new("ex.com", 2, 2);
        f.admit(url("https://ex.com/"), 0).unwrap();
        f.admit(url("https://ex.com/a"), 1).unwrap();
        assert_eq!(
            f.admit(url("https://ex.com/b"), 1),
            Err(SkipReason::BudgetExhausted)
        );
        assert_eq!(
            f.admit(url("https://ex.com/c"), 1),
            Err(SkipReason::BudgetExhausted)
        );
        assert_eq!(f.budget_rejections(), 2);
        // already-known links are not budget rejections
        assert_eq!(
            f.admit(url("https://ex.com/a"), 1),
            Err(SkipReason::AlreadyKnown)
        );
        assert_eq!(f.budget_rejections(), 2);
    }

    #[test]
    fn test_take_batch_drains() {
        let mut f = frontier();
        f.admit(url("https://ex.com/"), 0).unwrap();
        let batch = f.take_batch();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].depth, 0);
        assert!(f.is_empty());
        assert!(f.take_batch().is_empty());
    }

    #[test]
    fn test_state_transitions() {
        let mut f = frontier();
        let root = url("https://ex.com/");
        f.admit(root.clone(), 0).unwrap();

        assert!(!f.mark(&root, PageState::Extracted));
        assert!(f.mark(&root, PageState::Fetching));
        assert!(f.mark(&root, PageState::Extracted));
        assert!(!f.mark(&root, PageState::FetchFailed));
        assert_eq!(f.state(&root), PageState::Extracted);
        assert_eq!(f.count_in(PageState::Extracted), 1);
    }

    #[test]
    fn test_mark_unknown_url() {
        let mut f = frontier();
        assert!(!f.mark(&url("https://ex.com/x"), PageState::Fetching));
        assert_eq!(f.state(&url("https://ex.com/x")), PageState::Unseen);
    }

    #[test]
    fn test_port_scoped() {
        let mut f = Frontier::new("127.0.0.1:8080", 1, 10);
        assert!(f.admit(url("http://127.0.0.1:8080/a"), 1).is_ok());
        assert_eq!(
            f.admit(url("http://127.0.0.1:9090/a"), 1),
            Err(SkipReason::OffDomain)
        );
    }

    #[test]
    fn test_only_base_domain_is_admitted() {
        let mut f = frontier();
        for link in ["https://ex.com/", "https://ex.com/a", "https://o.com/", "https://ex.com/b"] {
            let _ = f.admit(url(link), 1);
        }
        assert_eq!(f.visited_count(), 3);
        assert_eq!(f.state(&url("https://o.com/")), PageState::Unseen);
        assert_eq!(f.state(&url("https://ex.com/b")), PageState::Enqueued);
    }
}
