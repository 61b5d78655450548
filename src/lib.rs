//! Site-Harvester: a domain-bounded site crawler and fact extractor
//!
//! This crate crawls a website within its own domain, extracts structured facts
//! (text, images, contacts, products, social links, page metadata) from every
//! fetched page and assembles a sitemap describing crawl coverage. Results are
//! handed to a document store as one JSON document per data type.

pub mod aggregate;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod service;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Site-Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scrape error: {0}")]
    Scrape(#[from] ScrapeError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Session-level failures that abort a whole scrape
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Scraping timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Failed to scrape {url}: {source}")]
    RootUnreachable {
        url: String,
        source: crawler::FetchError,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Extractor setup failed: {0}")]
    Extractor(#[from] extract::ExtractionError),
}

impl ScrapeError {
    /// Short error kind reported in structured responses
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) | Self::InvalidRequest(_) => "ValidationError",
            Self::Timeout { .. } => "TimeoutError",
            Self::RootUnreachable { .. } => "ScrapingError",
            Self::Client(_) | Self::Extractor(_) => "InternalError",
        }
    }
}

// Re-export commonly used types
pub use aggregate::{CoverageSummary, CrawlResult, Sitemap};
pub use config::Config;
pub use crawler::CrawlSession;
pub use service::{ScrapeRequest, ScrapeResponse, ScrapeService};
pub use state::PageState;
pub use url::{extract_domain, normalize_url};
