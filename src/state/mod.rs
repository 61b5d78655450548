//! State module for tracking crawl progress
//!
//! - `PageState`: where each URL stands within the current crawl session

mod page_state;

pub use page_state::PageState;
