//! Coverage report for a finished crawl
//!
//! This module turns a [`CrawlResult`] into the counts shown by the CLI's
//! `--summary` flag.

use crate::aggregate::CrawlResult;
use std::collections::BTreeMap;

/// Crawl coverage figures
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageReport {
    pub pages_crawled: usize,
    pub urls_visited: usize,
    pub failed_pages: usize,
    pub fallback_pages: usize,
    pub links_rejected: usize,

    /// Pages per depth
    pub pages_by_depth: BTreeMap<u32, usize>,

    /// Item counts per collection, in persisted order
    pub items: Vec<(&'static str, usize)>,

    pub processing_time_seconds: f64,
}

impl CoverageReport {
    pub fn from_result(result: &CrawlResult) -> Self {
        let mut pages_by_depth = BTreeMap::new();
        for entry in result.sitemap.crawl_structure.values() {
            *pages_by_depth.entry(entry.depth).or_insert(0) += 1;
        }

        let coverage = &result.sitemap.coverage_summary;
        Self {
            pages_crawled: result.metadata.total_pages_crawled,
            urls_visited: result.metadata.urls_visited,
            failed_pages: result.metadata.failed_pages,
            fallback_pages: result.metadata.fallback_pages,
            links_rejected: result.metadata.links_rejected,
            pages_by_depth,
            items: vec![
                ("text", coverage.pages_with_text),
                ("images", coverage.pages_with_images),
                ("contact", coverage.pages_with_contact),
                ("products", coverage.pages_with_products),
                ("social_media", coverage.pages_with_social_media),
            ],
            processing_time_seconds: result.metadata.processing_time_seconds,
        }
    }

    /// Share of visited URLs that were fetched and extracted, in percent
    pub fn success_rate(&self) -> f64 {
        if self.urls_visited > 0 {
            (self.pages_crawled as f64 / self.urls_visited as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Prints the coverage report to stdout in a formatted manner
pub fn print_coverage(result: &CrawlResult) {
    let report = CoverageReport::from_result(result);

    println!("=== Crawl Coverage ===\n");

    println!("Overview:");
    println!("  Source: {}", result.metadata.source_url);
    println!("  Base domain: {}", result.metadata.base_domain);
    println!("  Pages crawled: {}", report.pages_crawled);
    println!("  URLs visited: {}", report.urls_visited);
    println!("  Failed pages: {}", report.failed_pages);
    println!("  Fallback pages: {}", report.fallback_pages);
    println!("  Links rejected by budget: {}", report.links_rejected);
    println!("  Processing time: {:.2}s", report.processing_time_seconds);
    println!();

    println!("Pages by Depth:");
    for (depth, count) in &report.pages_by_depth {
        println!("  {}: {}", depth, count);
    }
    println!();

    println!("Items Extracted:");
    for (name, count) in &report.items {
        println!("  {}: {}", name, count);
    }
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} visited URLs extracted)",
        report.success_rate(),
        report.pages_crawled,
        report.urls_visited
    );
}
