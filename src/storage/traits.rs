//! Storage traits and error types
//!
//! This module defines the interface every document store implements and
//! the errors they share.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage lock poisoned: {0}")]
    Lock(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid document location: {0}")]
    InvalidLocation(String),
}

impl StorageError {
    /// True for failures that may succeed on a later attempt
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Kinds of crawl output, one persisted document each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Text,
    Images,
    Contact,
    Products,
    SocialMedia,
    Metadata,
    RawHtml,
    Sitemap,
}

impl DataType {
    pub const ALL: [DataType; 8] = [
        DataType::Text,
        DataType::Images,
        DataType::Contact,
        DataType::Products,
        DataType::SocialMedia,
        DataType::Metadata,
        DataType::RawHtml,
        DataType::Sitemap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Images => "images",
            Self::Contact => "contact",
            Self::Products => "products",
            Self::SocialMedia => "social_media",
            Self::Metadata => "metadata",
            Self::RawHtml => "raw_html",
            Self::Sitemap => "sitemap",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Folder (or column value) used for error documents
pub const ERRORS_FOLDER: &str = "errors";

/// Listing entry for a stored document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredDocument {
    /// `<company>/<data_type>/<file name>`
    pub key: String,
    pub size: u64,
    pub last_modified: String,
    /// Opaque location accepted by [`DocumentStore::load`]
    pub location: String,
}

/// A sink for named, typed JSON documents
///
/// Locations returned by `store` are opaque strings that the same store can
/// `load` and `delete` later. Implementations must be shareable between tasks.
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs
    fn kind(&self) -> &'static str;

    /// Creates whatever per-company layout the backend needs
    fn prepare_company(&self, company: &str) -> StorageResult<()>;

    /// Persists one data-type document and returns its location
    fn store(
        &self,
        company: &str,
        data_type: DataType,
        payload: &serde_json::Value,
    ) -> StorageResult<String>;

    /// Persists an error document and returns its location
    fn store_error(&self, company: &str, payload: &serde_json::Value) -> StorageResult<String>;

    /// Lists a company's documents, optionally for one data type
    fn list_documents(
        &self,
        company: &str,
        data_type: Option<DataType>,
    ) -> StorageResult<Vec<StoredDocument>>;

    /// Reads a document back
    fn load(&self, location: &str) -> StorageResult<serde_json::Value>;

    /// Removes a document; false if it did not exist
    fn delete(&self, location: &str) -> StorageResult<bool>;
}
