//! Output module for shaping crawl results
//!
//! This module handles:
//! - Building the per-data-type documents handed to storage
//! - Printing a coverage report for a finished crawl

mod documents;
pub mod stats;

pub use documents::{build_documents, ExtractionSummary, PersistedDocument};
pub use stats::{print_coverage, CoverageReport};
