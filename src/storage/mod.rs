//! Storage module for persisting crawl output
//!
//! Each scrape produces one JSON document per data type. Two backends exist:
//! - `LocalStore`: a directory tree of `.json` files, `file://` locations
//! - `SqliteStore`: a single `documents` table, `sqlite://<db>#<id>` locations
//!
//! Writes retry transient failures with exponential backoff.

mod local;
mod schema;
mod sqlite;
mod traits;

pub use local::LocalStore;
pub use sqlite::SqliteStore;
pub use traits::{
    DataType, DocumentStore, StorageError, StorageResult, StoredDocument, ERRORS_FOLDER,
};

use crate::config::{StorageBackend, StorageConfig};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Backoff schedule for document writes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2,
        }
    }
}

impl RetryPolicy {
    /// Policy that never sleeps, for tests
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::ZERO,
            backoff_factor: 1,
        }
    }
}

/// Runs `op`, retrying transient storage errors per `policy`
///
/// Blocks the calling thread while backing off; callers on the async runtime
/// run stores inside `spawn_blocking`.
pub fn with_retry<T>(
    policy: RetryPolicy,
    what: &str,
    mut op: impl FnMut() -> StorageResult<T>,
) -> StorageResult<T> {
    let mut delay = policy.initial_delay;
    let mut attempt = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    what,
                    attempt,
                    policy.max_retries + 1,
                    e,
                    delay
                );
                std::thread::sleep(delay);
                delay *= policy.backoff_factor;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Normalizes a company name for folder and file names
///
/// Lowercases, drops everything but word characters, whitespace and hyphens,
/// folds whitespace/hyphen runs into `_` and trims outer underscores.
pub fn sanitize_for_path(company: &str) -> String {
    let kept: String = company
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();

    let mut out = String::with_capacity(kept.len());
    let mut in_run = false;
    for c in kept.chars() {
        if c == '-' || c.is_whitespace() {
            if !in_run {
                out.push('_');
            }
            in_run = true;
        } else {
            out.extend(c.to_lowercase());
            in_run = false;
        }
    }
    out.trim_matches('_').to_string()
}

/// `YYYYmmdd_HHMMSS` in UTC
pub fn timestamp_slug(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// `<company>_<data_type>_<timestamp>.json`
pub fn document_file_name(company: &str, data_type: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}_{}_{}.json",
        sanitize_for_path(company),
        data_type,
        timestamp_slug(at)
    )
}

/// `<company>_crawl_error_<timestamp>.json`
pub fn error_file_name(company: &str, at: DateTime<Utc>) -> String {
    document_file_name(company, "crawl_error", at)
}

/// Opens the backend selected in the configuration
pub fn open_store(config: &StorageConfig) -> StorageResult<Arc<dyn DocumentStore>> {
    match config.backend {
        StorageBackend::Local => Ok(Arc::new(LocalStore::new(&config.base_path)?)),
        StorageBackend::Sqlite => Ok(Arc::new(SqliteStore::open(&config.database_path)?)),
    }
}
