//! Crawl-wide collections, sitemap and coverage statistics
//!
//! Pages are folded in the order their fetches complete. Once
//! [`Aggregator::finish`] returns, the [`CrawlResult`] is never mutated.

use crate::crawler::FetchMethod;
use crate::extract::{
    ContactItem, ImageItem, PageMetadata, PageRecord, ProductItem, SocialItem, TextItem,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Links kept per sitemap entry
pub const SITEMAP_LINK_LIMIT: usize = 10;

/// One crawled page in the sitemap
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SitemapEntry {
    pub depth: u32,
    /// First outbound same-domain links
    pub links_found: Vec<String>,
    /// Record types that yielded at least one item on this page
    pub data_extracted: Vec<String>,
}

/// Item counts across the crawl
///
/// The `pages_with_*` fields count items in each collection, not distinct
/// pages. `total_pages` is the number of sitemap entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoverageSummary {
    pub total_pages: usize,
    pub pages_with_text: usize,
    pub pages_with_images: usize,
    pub pages_with_contact: usize,
    pub pages_with_products: usize,
    pub pages_with_social_media: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Sitemap {
    pub crawl_structure: BTreeMap<String, SitemapEntry>,
    pub coverage_summary: CoverageSummary,
}

/// The typed collections of a crawl
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlData {
    pub text: Vec<TextItem>,
    pub images: Vec<ImageItem>,
    pub contact: Vec<ContactItem>,
    pub products: Vec<ProductItem>,
    pub social_media: Vec<SocialItem>,
    pub metadata: Vec<PageMetadata>,
}

/// Session facts recorded alongside the data
#[derive(Debug, Clone, Serialize)]
pub struct CrawlMetadata {
    pub scraping_timestamp: String,
    pub source_url: String,
    pub company_name: String,
    pub extraction_method: String,
    pub crawl_depth: u32,
    /// Pages fetched and extracted
    pub total_pages_crawled: usize,
    /// URLs admitted to the visited set
    pub urls_visited: usize,
    /// Admitted URLs whose fetch failed on both transports
    pub failed_pages: usize,
    /// Extracted pages that came through the fallback transport
    pub fallback_pages: usize,
    /// Links turned away by the page budget
    pub links_rejected: usize,
    pub processing_time_seconds: f64,
    pub base_domain: String,
}

/// Everything one scrape produced
#[derive(Debug, Clone, Serialize)]
pub struct CrawlResult {
    pub metadata: CrawlMetadata,
    pub data: CrawlData,
    pub raw_html: BTreeMap<String, String>,
    pub sitemap: Sitemap,
}

/// Accumulates page records for one session
#[derive(Debug, Default)]
pub struct Aggregator {
    data: CrawlData,
    raw_html: BTreeMap<String, String>,
    crawl_structure: BTreeMap<String, SitemapEntry>,
    fallback_pages: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one page's records to the crawl-wide collections
    pub fn fold(&mut self, record: PageRecord) {
        let mut data_extracted = Vec::new();
        for (name, present) in [
            ("text", !record.text.is_empty()),
            ("images", !record.images.is_empty()),
            ("contact", !record.contacts.is_empty()),
            ("products", !record.products.is_empty()),
            ("social_media", !record.social.is_empty()),
        ] {
            if present {
                data_extracted.push(name.to_string());
            }
        }

        let entry = SitemapEntry {
            depth: record.depth,
            links_found: record
                .links
                .iter()
                .take(SITEMAP_LINK_LIMIT)
                .map(|u| u.to_string())
                .collect(),
            data_extracted,
        };

        if record.method == FetchMethod::Fallback {
            self.fallback_pages += 1;
        }

        self.data.text.extend(record.text);
        self.data.images.extend(record.images);
        self.data.contact.extend(record.contacts);
        self.data.products.extend(record.products);
        self.data.social_media.extend(record.social);
        self.data.metadata.push(record.metadata);
        self.raw_html.insert(record.url.clone(), record.raw_html);
        self.crawl_structure.insert(record.url, entry);
    }

    pub fn summarize(&self) -> CoverageSummary {
        CoverageSummary {
            total_pages: self.crawl_structure.len(),
            pages_with_text: self.data.text.len(),
            pages_with_images: self.data.images.len(),
            pages_with_contact: self.data.contact.len(),
            pages_with_products: self.data.products.len(),
            pages_with_social_media: self.data.social_media.len(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.crawl_structure.len()
    }

    pub fn fallback_pages(&self) -> usize {
        self.fallback_pages
    }

    /// Seals the aggregate into an immutable result
    pub fn finish(self, mut metadata: CrawlMetadata) -> CrawlResult {
        let coverage_summary = self.summarize();
        metadata.total_pages_crawled = self.crawl_structure.len();
        metadata.fallback_pages = self.fallback_pages;

        CrawlResult {
            metadata,
            data: self.data,
            raw_html: self.raw_html,
            sitemap: Sitemap {
                crawl_structure: self.crawl_structure,
                coverage_summary,
            },
        }
    }
}
