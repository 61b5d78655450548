//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with a single fallback attempt
//! - The per-session frontier (visited set, scoping, depth and budget)
//! - Depth-batched, bounded-concurrency expansion

mod coordinator;
mod fetcher;
mod scheduler;

pub use coordinator::{CrawlSession, EXTRACTION_METHOD};
pub use fetcher::{
    build_http_client, FallbackTransport, FetchError, FetchMethod, FetchedPage, Fetcher,
    HttpTransport, Transport, PRIMARY_TIMEOUT_CAP,
};
pub use scheduler::{Frontier, QueuedUrl, SkipReason};

use crate::aggregate::CrawlResult;
use crate::config::Config;
use crate::ScrapeError;

/// Crawls a site with the configured transports
///
/// This is the main entry point for a one-off crawl. It will:
/// 1. Normalize the root URL and fix the base domain
/// 2. Build the primary and fallback HTTP clients
/// 3. Expand the site depth by depth up to `max_depth`
/// 4. Return the sealed aggregate
pub async fn crawl(
    root_url: &str,
    company_name: &str,
    max_depth: u32,
    config: &Config,
) -> Result<CrawlResult, ScrapeError> {
    CrawlSession::new(root_url, company_name, max_depth, config)?
        .run()
        .await
}
