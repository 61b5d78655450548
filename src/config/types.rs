use serde::{Deserialize, Serialize};

/// Main configuration structure for Site-Harvester
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub fallback: FallbackConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Default maximum depth to crawl from the root URL
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Process-wide cap on simultaneous fetches
    #[serde(rename = "max-concurrent-requests")]
    pub max_concurrent_requests: u32,

    /// Cap on simultaneous fetches within one depth batch
    #[serde(rename = "expansion-concurrency")]
    pub expansion_concurrency: u32,

    /// Per-page timeout in seconds (the primary transport caps this at 30)
    #[serde(rename = "page-timeout-secs")]
    pub page_timeout_secs: u64,

    /// Upper bound on the whole crawl session, in seconds
    #[serde(rename = "session-timeout-secs")]
    pub session_timeout_secs: u64,

    /// Delay each worker waits before issuing a fetch (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    /// Frontier-wide budget of pages enqueued per session
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Optional cap on links followed from a single page
    #[serde(rename = "links-per-page")]
    pub links_per_page: Option<usize>,
}

impl CrawlerConfig {
    /// Number of workers allowed to fetch at once inside a depth batch
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrent_requests
            .min(self.expansion_concurrency)
            .max(1) as usize
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_concurrent_requests: 10,
            expansion_concurrency: 3,
            page_timeout_secs: 300,
            session_timeout_secs: 600,
            request_delay_ms: 500,
            max_pages: 100,
            links_per_page: None,
        }
    }
}

/// User agent identification for the primary transport
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the identity as `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SiteHarvester".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/site-harvester".to_string(),
            contact_email: "crawler@example.com".to_string(),
        }
    }
}

/// Settings for the secondary transport used when the primary fails
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Browser-like User-Agent header
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
            timeout_secs: 30,
        }
    }
}

/// Which document store receives crawl output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    Sqlite,
}

/// Output storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Root directory for the local document tree
    #[serde(rename = "base-path")]
    pub base_path: String,

    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            base_path: "outputs".to_string(),
            database_path: "outputs/harvest.db".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
