//! Crawler coordinator - main crawl orchestration logic
//!
//! A session expands the site breadth-first, one depth level per batch:
//! - the coordinating task takes every pending URL from the frontier
//! - each URL gets a worker that waits for a permit, sleeps the request
//!   delay, fetches and extracts
//! - results are folded in completion order, and links from extracted pages
//!   are admitted one level deeper
//!
//! Only the coordinating task touches the frontier and the aggregator. The
//! whole expansion runs under the session timeout; on expiry the partial
//! aggregate is discarded.

use crate::aggregate::{Aggregator, CrawlMetadata, CrawlResult};
use crate::config::{Config, CrawlerConfig};
use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::crawler::scheduler::{Frontier, QueuedUrl, SkipReason};
use crate::extract::{Extractor, PageRecord};
use crate::state::PageState;
use crate::url::{extract_domain, normalize_url};
use crate::{ScrapeError, UrlError};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Tag recorded as the crawl-wide extraction method
pub const EXTRACTION_METHOD: &str = "http_dom_parsing";

/// One scrape of one site
///
/// Created per scrape call and consumed by [`CrawlSession::run`]. Workers get
/// shared handles to the fetcher and extractor only.
pub struct CrawlSession {
    root: Url,
    base_domain: String,
    max_depth: u32,
    company_name: String,
    crawler: CrawlerConfig,
    fetcher: Arc<Fetcher>,
    extractor: Arc<Extractor>,
}

impl CrawlSession {
    /// Creates a session that fetches through the configured HTTP transports
    ///
    /// # Arguments
    ///
    /// * `root_url` - Where the crawl starts; also fixes the base domain
    /// * `company_name` - Recorded in the result metadata
    /// * `max_depth` - Deepest link distance from the root to fetch
    /// * `config` - Crawler, user-agent and fallback settings
    pub fn new(
        root_url: &str,
        company_name: &str,
        max_depth: u32,
        config: &Config,
    ) -> Result<Self, ScrapeError> {
        let fetcher = Fetcher::from_config(config)?;
        Self::with_fetcher(
            root_url,
            company_name,
            max_depth,
            config.crawler.clone(),
            Arc::new(fetcher),
        )
    }

    /// Creates a session around an existing fetcher
    pub fn with_fetcher(
        root_url: &str,
        company_name: &str,
        max_depth: u32,
        crawler: CrawlerConfig,
        fetcher: Arc<Fetcher>,
    ) -> Result<Self, ScrapeError> {
        let root = normalize_url(root_url)?;
        let base_domain = extract_domain(&root).ok_or(UrlError::MissingDomain)?;

        Ok(Self {
            root,
            base_domain,
            max_depth,
            company_name: company_name.to_string(),
            crawler,
            fetcher,
            extractor: Arc::new(Extractor::new()?),
        })
    }

    /// Runs the crawl to completion or until the session timeout
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlResult)` - The frontier was exhausted
    /// * `Err(ScrapeError::Timeout)` - The session timeout expired first
    /// * `Err(ScrapeError::RootUnreachable)` - The root page could not be fetched
    pub async fn run(self) -> Result<CrawlResult, ScrapeError> {
        let started = Instant::now();
        let scraping_timestamp = Utc::now().to_rfc3339();
        let seconds = self.crawler.session_timeout_secs;

        tracing::info!(
            "Starting scrape of {} with depth {} (base domain {})",
            self.root,
            self.max_depth,
            self.base_domain
        );

        let (aggregator, frontier) =
            match tokio::time::timeout(Duration::from_secs(seconds), self.crawl()).await {
                Ok(outcome) => outcome?,
                Err(_) => {
                    tracing::warn!("Scrape of {} timed out after {}s", self.root, seconds);
                    return Err(ScrapeError::Timeout { seconds });
                }
            };

        let elapsed = started.elapsed().as_secs_f64();
        tracing::info!(
            "Completed scrape of {}. Pages crawled: {}, URLs visited: {}, time: {:.2}s",
            self.root,
            aggregator.page_count(),
            frontier.visited_count(),
            elapsed
        );

        let metadata = CrawlMetadata {
            scraping_timestamp,
            source_url: self.root.to_string(),
            company_name: self.company_name.clone(),
            extraction_method: EXTRACTION_METHOD.to_string(),
            crawl_depth: self.max_depth,
            total_pages_crawled: aggregator.page_count(),
            urls_visited: frontier.visited_count(),
            failed_pages: frontier.count_in(PageState::FetchFailed),
            fallback_pages: aggregator.fallback_pages(),
            links_rejected: frontier.budget_rejections(),
            processing_time_seconds: (elapsed * 100.0).round() / 100.0,
            base_domain: self.base_domain.clone(),
        };

        Ok(aggregator.finish(metadata))
    }

    async fn crawl(&self) -> Result<(Aggregator, Frontier), ScrapeError> {
        let mut frontier = Frontier::new(
            self.base_domain.clone(),
            self.max_depth,
            self.crawler.max_pages,
        );
        let mut aggregator = Aggregator::new();
        let semaphore = Arc::new(Semaphore::new(self.crawler.effective_concurrency()));
        let delay = Duration::from_millis(self.crawler.request_delay_ms);

        frontier.admit(self.root.clone(), 0).map_err(|reason| {
            ScrapeError::InvalidRequest(format!("Root URL {} rejected: {}", self.root, reason))
        })?;

        while !frontier.is_empty() {
            let batch = frontier.take_batch();
            tracing::debug!("Expanding batch of {} URLs", batch.len());

            let mut workers = JoinSet::new();
            for queued in batch {
                frontier.mark(&queued.url, PageState::Fetching);

                let fetcher = Arc::clone(&self.fetcher);
                let extractor = Arc::clone(&self.extractor);
                let semaphore = Arc::clone(&semaphore);
                workers.spawn(async move {
                    let outcome = crawl_page(&fetcher, &extractor, semaphore, delay, &queued).await;
                    (queued, outcome)
                });
            }

            while let Some(joined) = workers.join_next().await {
                let (queued, outcome) = match joined {
                    Ok(done) => done,
                    Err(e) => {
                        tracing::error!("Crawl worker panicked: {}", e);
                        continue;
                    }
                };

                match outcome {
                    Ok(record) => {
                        tracing::info!(
                            "Crawled {} at depth {} via {} transport",
                            queued.url,
                            queued.depth,
                            record.method.as_str()
                        );
                        frontier.mark(&queued.url, PageState::Extracted);
                        self.enqueue_links(&mut frontier, &record, queued.depth + 1);
                        aggregator.fold(record);
                    }
                    Err(e) => {
                        frontier.mark(&queued.url, PageState::FetchFailed);
                        if queued.depth == 0 {
                            return Err(ScrapeError::RootUnreachable {
                                url: queued.url.to_string(),
                                source: e,
                            });
                        }
                        tracing::warn!("Skipping {}: {}", queued.url, e);
                    }
                }
            }
        }

        if frontier.budget_rejections() > 0 {
            tracing::warn!(
                "Page budget of {} reached; {} links were not crawled",
                self.crawler.max_pages,
                frontier.budget_rejections()
            );
        }

        Ok((aggregator, frontier))
    }

    fn enqueue_links(&self, frontier: &mut Frontier, record: &PageRecord, depth: u32) {
        if depth > self.max_depth {
            return;
        }

        let limit = self.crawler.links_per_page.unwrap_or(usize::MAX);
        let mut admitted = 0usize;
        for link in record.links.iter().take(limit) {
            match frontier.admit(link.clone(), depth) {
                Ok(()) => admitted += 1,
                Err(SkipReason::BudgetExhausted) => {
                    tracing::debug!("Page budget exhausted, not enqueuing {}", link)
                }
                Err(reason) => tracing::debug!("Not enqueuing {}: {}", link, reason),
            }
        }

        if record.links.len() > limit {
            tracing::debug!(
                "Followed {} of {} links on {} (per-page cap)",
                limit,
                record.links.len(),
                record.url
            );
        }
        tracing::debug!("Enqueued {} new links from {}", admitted, record.url);
    }
}

/// Worker body: wait for a permit, pause, fetch, extract
async fn crawl_page(
    fetcher: &Fetcher,
    extractor: &Extractor,
    semaphore: Arc<Semaphore>,
    delay: Duration,
    queued: &QueuedUrl,
) -> Result<PageRecord, FetchError> {
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| FetchError::Network {
            url: queued.url.to_string(),
            message: e.to_string(),
        })?;

    tokio::time::sleep(delay).await;

    let page = fetcher.fetch(&queued.url).await?;
    Ok(extractor
        .extract(&page.html, &queued.url, queued.depth)
        .with_method(page.method))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::Transport;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory site: path -> html; records every fetched URL
    struct Site {
        pages: HashMap<String, String>,
        fetched: Mutex<Vec<String>>,
    }

    impl Site {
        fn new(pages: &[(&str, &str)]) -> Arc<Self> {
            Arc::new(Self {
                pages: pages
                    .iter()
                    .map(|(url, html)| (url.to_string(), html.to_string()))
                    .collect(),
                fetched: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for Site {
        async fn fetch_html(
            &self,
            url: &Url,
            _timeout: Duration,
        ) -> Result<(String, String), FetchError> {
            self.fetched.lock().unwrap().push(url.to_string());
            match self.pages.get(url.as_str()) {
                Some(html) => Ok((html.clone(), crate::extract::plain_text(html))),
                None => Err(FetchError::Http {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    /// Transport that never answers in time
    struct Stalled;

    #[async_trait]
    impl Transport for Stalled {
        async fn fetch_html(
            &self,
            _url: &Url,
            _timeout: Duration,
        ) -> Result<(String, String), FetchError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok((String::new(), String::new()))
        }
    }

    fn crawler_config() -> CrawlerConfig {
        CrawlerConfig {
            request_delay_ms: 0,
            ..CrawlerConfig::default()
        }
    }

    fn session(site: Arc<Site>, max_depth: u32, crawler: CrawlerConfig) -> CrawlSession {
        let fetcher = Fetcher::new(
            site.clone(),
            site,
            Duration::from_secs(5),
            Duration::from_secs(5),
        );
        CrawlSession::with_fetcher("https://ex.com/", "Ex", max_depth, crawler, Arc::new(fetcher))
            .unwrap()
    }

    #[tokio::test]
    async fn test_only_same_domain_crawled() {
        let site = Site::new(&[
            (
                "https://ex.com/",
                r#"<a href="https://ex.com/a">A</a><a href="https://other.com/b">B</a>"#,
            ),
            ("https://ex.com/a", "<p>page a</p>"),
        ]);
        let result = session(site.clone(), 1, crawler_config()).run().await.unwrap();

        let crawled: Vec<&String> = result.sitemap.crawl_structure.keys().collect();
        assert_eq!(crawled, vec!["https://ex.com/", "https://ex.com/a"]);
        assert!(!site
            .fetched
            .lock()
            .unwrap()
            .iter()
            .any(|u| u.contains("other.com")));
    }

    #[tokio::test]
    async fn test_depth_bound_respected() {
        let site = Site::new(&[
            ("https://ex.com/", r#"<a href="/one">1</a>"#),
            ("https://ex.com/one", r#"<a href="/two">2</a>"#),
            ("https://ex.com/two", r#"<a href="/three">3</a>"#),
            ("https://ex.com/three", "<p>deep</p>"),
        ]);
        let result = session(site, 2, crawler_config()).run().await.unwrap();

        assert_eq!(result.sitemap.crawl_structure.len(), 3);
        assert!(result
            .sitemap
            .crawl_structure
            .values()
            .all(|entry| entry.depth <= 2));
        assert!(!result
            .sitemap
            .crawl_structure
            .contains_key("https://ex.com/three"));
    }

    #[tokio::test]
    async fn test_no_url_fetched_twice() {
        let site = Site::new(&[
            ("https://ex.com/", r#"<a href="/a">a</a><a href="/b">b</a>"#),
            ("https://ex.com/a", r#"<a href="/b/">b</a><a href="/">home</a>"#),
            ("https://ex.com/b", r#"<a href="/a#x">a</a>"#),
        ]);
        session(site.clone(), 3, crawler_config()).run().await.unwrap();

        let mut fetched = site.fetched.lock().unwrap().clone();
        let total = fetched.len();
        fetched.sort();
        fetched.dedup();
        assert_eq!(total, fetched.len());
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn test_failed_child_does_not_abort() {
        let site = Site::new(&[(
            "https://ex.com/",
            r#"<a href="/missing">gone</a><p>Root page body text that is long enough.</p>"#,
        )]);
        let result = session(site, 1, crawler_config()).run().await.unwrap();

        assert_eq!(result.metadata.total_pages_crawled, 1);
        assert_eq!(result.metadata.urls_visited, 2);
        assert_eq!(result.metadata.failed_pages, 1);
    }

    #[tokio::test]
    async fn test_root_failure_is_terminal() {
        let site = Site::new(&[]);
        let err = session(site, 1, crawler_config()).run().await.unwrap_err();
        assert!(matches!(err, ScrapeError::RootUnreachable { .. }));
        assert_eq!(err.kind(), "ScrapingError");
    }

    #[tokio::test]
    async fn test_page_budget_limits_crawl() {
        let links: String = (0..10).map(|i| format!(r#"<a href="/p{}">p</a>"#, i)).collect();
        let mut pages: Vec<(String, String)> = vec![("https://ex.com/".to_string(), links)];
        for i in 0..10 {
            pages.push((format!("https://ex.com/p{}", i), "<p>leaf</p>".to_string()));
        }
        let refs: Vec<(&str, &str)> = pages.iter().map(|(u, h)| (u.as_str(), h.as_str())).collect();
        let site = Site::new(&refs);

        let crawler = CrawlerConfig {
            max_pages: 4,
            ..crawler_config()
        };
        let result = session(site, 1, crawler).run().await.unwrap();

        assert_eq!(result.metadata.urls_visited, 4);
        assert_eq!(result.metadata.links_rejected, 7);
    }

    #[tokio::test]
    async fn test_links_per_page_cap() {
        let site = Site::new(&[
            (
                "https://ex.com/",
                r#"<a href="/a">a</a><a href="/b">b</a><a href="/c">c</a>"#,
            ),
            ("https://ex.com/a", "<p>a</p>"),
            ("https://ex.com/b", "<p>b</p>"),
            ("https://ex.com/c", "<p>c</p>"),
        ]);
        let crawler = CrawlerConfig {
            links_per_page: Some(2),
            ..crawler_config()
        };
        let result = session(site, 1, crawler).run().await.unwrap();
        assert_eq!(result.sitemap.crawl_structure.len(), 3);
    }

    #[tokio::test]
    async fn test_session_timeout() {
        let fetcher = Fetcher::new(
            Arc::new(Stalled),
            Arc::new(Stalled),
            Duration::from_secs(5),
            Duration::from_secs(5),
        );
        let crawler = CrawlerConfig {
            session_timeout_secs: 1,
            ..crawler_config()
        };
        let session =
            CrawlSession::with_fetcher("https://ex.com/", "Ex", 1, crawler, Arc::new(fetcher))
                .unwrap();

        let err = session.run().await.unwrap_err();
        assert!(matches!(err, ScrapeError::Timeout { seconds: 1 }));
    }

    #[test]
    fn test_invalid_root_rejected() {
        let site = Site::new(&[]);
        let fetcher = Arc::new(Fetcher::new(
            site.clone(),
            site,
            Duration::from_secs(1),
            Duration::from_secs(1),
        ));
        let result =
            CrawlSession::with_fetcher("ftp://ex.com/", "Ex", 1, crawler_config(), fetcher);
        assert!(matches!(result, Err(ScrapeError::InvalidUrl(_))));
    }
}
