//! Scrape orchestration: request validation, crawl, persistence
//!
//! [`ScrapeService::scrape`] never fails. Every outcome, including invalid
//! requests and storage trouble, comes back as a [`ScrapeResponse`] whose
//! `status` is `success` or `error`.

use crate::aggregate::{CrawlMetadata, CrawlResult};
use crate::config::Config;
use crate::crawler::{CrawlSession, Fetcher};
use crate::output::build_documents;
use crate::storage::{open_store, DataType, DocumentStore, StorageResult};
use crate::url::{company_name_from_url, normalize_url};
use crate::ScrapeError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Longest accepted company name, in characters
pub const MAX_COMPANY_NAME_LEN: usize = 100;

/// Allowed range for a requested crawl depth
pub const DEPTH_RANGE: std::ops::RangeInclusive<u32> = 1..=5;

/// Inputs of one scrape
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ScrapeRequest {
    pub url: String,
    /// Derived from the URL when absent
    pub company_name: Option<String>,
    /// Falls back to the configured depth when absent
    pub max_depth: Option<u32>,
}

impl ScrapeRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = Some(name.into());
        self
    }

    pub fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Checks the request and resolves its defaults
    ///
    /// # Returns
    ///
    /// * `Ok(ValidatedRequest)` - URL, company name and depth ready for a crawl
    /// * `Err(ScrapeError)` - A validation error describing the bad field
    pub fn validate(&self, default_depth: u32) -> Result<ValidatedRequest, ScrapeError> {
        let root = normalize_url(&self.url)?;

        let company_name = match &self.company_name {
            Some(name) => sanitize_company_name(name)?,
            None => company_name_from_url(&root),
        };

        let max_depth = self.max_depth.unwrap_or(default_depth);
        if !DEPTH_RANGE.contains(&max_depth) {
            return Err(ScrapeError::InvalidRequest(format!(
                "max_depth must be between {} and {}, got {}",
                DEPTH_RANGE.start(),
                DEPTH_RANGE.end(),
                max_depth
            )));
        }

        Ok(ValidatedRequest {
            url: root.to_string(),
            company_name,
            max_depth,
        })
    }

    /// Best available company name for a request that failed validation
    fn fallback_company_name(&self) -> String {
        if let Some(name) = self
            .company_name
            .as_deref()
            .and_then(|n| sanitize_company_name(n).ok())
        {
            return name;
        }
        match normalize_url(&self.url) {
            Ok(url) => company_name_from_url(&url),
            Err(_) => "unknown_domain".to_string(),
        }
    }
}

/// A request whose fields passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub url: String,
    pub company_name: String,
    pub max_depth: u32,
}

/// Cleans a caller-supplied company name
///
/// Removes everything but word characters, whitespace and hyphens, folds
/// whitespace/hyphen runs into `_` and trims outer underscores. Case is kept.
pub fn sanitize_company_name(name: &str) -> Result<String, ScrapeError> {
    if name.chars().count() > MAX_COMPANY_NAME_LEN {
        return Err(ScrapeError::InvalidRequest(format!(
            "company_name must be at most {} characters",
            MAX_COMPANY_NAME_LEN
        )));
    }

    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if c == '-' || c.is_whitespace() {
            if !in_run {
                out.push('_');
            }
            in_run = true;
        } else if c.is_alphanumeric() || c == '_' {
            out.push(c);
            in_run = false;
        }
    }

    let out = out.trim_matches('_');
    if out.is_empty() {
        return Err(ScrapeError::InvalidRequest(
            "company_name cannot be empty after sanitization".to_string(),
        ));
    }
    Ok(out.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStatus {
    Success,
    Error,
}

/// Structured outcome of one scrape
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeResponse {
    pub status: ScrapeStatus,
    pub company_name: String,
    pub url: String,
    pub timestamp: String,

    /// Location per persisted data type; failed writes are left out
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_files: Option<BTreeMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CrawlMetadata>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_file: Option<String>,
}

impl ScrapeResponse {
    pub fn is_success(&self) -> bool {
        self.status == ScrapeStatus::Success
    }

    fn failure(company_name: String, url: String, err: &ScrapeError) -> Self {
        Self {
            status: ScrapeStatus::Error,
            company_name,
            url,
            timestamp: Utc::now().to_rfc3339(),
            storage_files: None,
            metadata: None,
            error_type: Some(err.kind().to_string()),
            error_message: Some(err.to_string()),
            error_file: None,
        }
    }
}

/// Runs scrapes and hands their output to a document store
pub struct ScrapeService {
    config: Config,
    store: Arc<dyn DocumentStore>,
    fetcher: Arc<Fetcher>,
}

impl ScrapeService {
    /// Creates a service with the configured HTTP transports
    pub fn new(config: Config, store: Arc<dyn DocumentStore>) -> Result<Self, ScrapeError> {
        let fetcher = Fetcher::from_config(&config)?;
        Ok(Self::with_fetcher(config, store, Arc::new(fetcher)))
    }

    /// Creates a service with the configured store and transports
    pub fn from_config(config: Config) -> Result<Self, crate::HarvestError> {
        let store = open_store(&config.storage)?;
        Ok(Self::new(config, store)?)
    }

    /// Creates a service around an existing fetcher
    pub fn with_fetcher(
        config: Config,
        store: Arc<dyn DocumentStore>,
        fetcher: Arc<Fetcher>,
    ) -> Self {
        Self {
            config,
            store,
            fetcher,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Scrapes a site and persists every non-empty data type
    pub async fn scrape(&self, request: &ScrapeRequest) -> ScrapeResponse {
        self.scrape_with_result(request).await.0
    }

    /// Like [`scrape`](Self::scrape), also returning the crawl result on success
    pub async fn scrape_with_result(
        &self,
        request: &ScrapeRequest,
    ) -> (ScrapeResponse, Option<CrawlResult>) {
        let validated = match request.validate(self.config.crawler.max_depth) {
            Ok(v) => v,
            Err(e) => {
                let company = request.fallback_company_name();
                let response = self
                    .fail(ScrapeResponse::failure(company, request.url.clone(), &e))
                    .await;
                return (response, None);
            }
        };

        info!(
            "Scraping {} for company {} (max depth {})",
            validated.url, validated.company_name, validated.max_depth
        );

        let company = validated.company_name.clone();
        if let Err(e) = self
            .blocking(move |store| store.prepare_company(&company))
            .await
        {
            warn!(
                "Could not prepare {} storage for {}: {}",
                self.store.kind(),
                validated.company_name,
                e
            );
        }

        let outcome = match CrawlSession::with_fetcher(
            &validated.url,
            &validated.company_name,
            validated.max_depth,
            self.config.crawler.clone(),
            self.fetcher.clone(),
        ) {
            Ok(session) => session.run().await,
            Err(e) => Err(e),
        };

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                error!("Failed to scrape {}: {}", validated.url, e);
                let response = self
                    .fail(ScrapeResponse::failure(
                        validated.company_name,
                        request.url.clone(),
                        &e,
                    ))
                    .await;
                return (response, None);
            }
        };

        let storage_files = self.persist(&result, &validated.company_name).await;
        let response = ScrapeResponse {
            status: ScrapeStatus::Success,
            company_name: validated.company_name,
            url: request.url.clone(),
            timestamp: result.metadata.scraping_timestamp.clone(),
            storage_files: Some(storage_files),
            metadata: Some(result.metadata.clone()),
            error_type: None,
            error_message: None,
            error_file: None,
        };
        (response, Some(result))
    }

    /// Stores one document per non-empty data type
    async fn persist(&self, result: &CrawlResult, company: &str) -> BTreeMap<String, String> {
        let mut storage_files = BTreeMap::new();

        let documents = match build_documents(result, company) {
            Ok(documents) => documents,
            Err(e) => {
                error!("Failed to serialize documents for {}: {}", company, e);
                return storage_files;
            }
        };

        for data_type in DataType::ALL {
            if !documents.iter().any(|(t, _)| *t == data_type) {
                info!("No {} data to store for {}", data_type, company);
            }
        }

        for (data_type, document) in documents {
            let owned_company = company.to_string();
            match self
                .blocking(move |store| store.store(&owned_company, data_type, &document))
                .await
            {
                Ok(location) => {
                    info!("Stored {} data: {}", data_type, location);
                    storage_files.insert(data_type.as_str().to_string(), location);
                }
                Err(e) => error!("Failed to store {} data for {}: {}", data_type, company, e),
            }
        }

        storage_files
    }

    /// Best-effort write of the error document
    async fn fail(&self, mut response: ScrapeResponse) -> ScrapeResponse {
        let payload = match serde_json::to_value(&response) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize error document: {}", e);
                return response;
            }
        };

        let company = response.company_name.clone();
        match self
            .blocking(move |store| store.store_error(&company, &payload))
            .await
        {
            Ok(location) => response.error_file = Some(location),
            Err(e) => error!(
                "Failed to store error document for {}: {}",
                response.company_name, e
            ),
        }
        response
    }

    /// Runs a store operation on the blocking pool
    async fn blocking<T, F>(&self, op: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn DocumentStore) -> StorageResult<T> + Send + 'static,
    {
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || op(store.as_ref())).await {
            Ok(result) => result,
            Err(e) => Err(crate::storage::StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("storage task failed: {}", e),
            ))),
        }
    }
}
