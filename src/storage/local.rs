//! Filesystem document store
//!
//! Layout: `<base>/<company>/<data_type>/<company>_<data_type>_<ts>.json`,
//! with error documents under `<base>/<company>/errors/`.

use crate::storage::traits::{
    DataType, DocumentStore, StorageError, StorageResult, StoredDocument, ERRORS_FOLDER,
};
use crate::storage::{
    document_file_name, error_file_name, sanitize_for_path, with_retry, RetryPolicy,
};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Writes pretty-printed JSON files under a base directory
pub struct LocalStore {
    base: PathBuf,
    retry: RetryPolicy,
}

impl LocalStore {
    /// Creates the base directory if needed
    pub fn new(base: impl AsRef<Path>) -> StorageResult<Self> {
        Self::with_retry_policy(base, RetryPolicy::default())
    }

    pub fn with_retry_policy(base: impl AsRef<Path>, retry: RetryPolicy) -> StorageResult<Self> {
        fs::create_dir_all(base.as_ref())?;
        let base = fs::canonicalize(base.as_ref())?;
        Ok(Self { base, retry })
    }

    pub fn base_path(&self) -> &Path {
        &self.base
    }

    fn company_dir(&self, company: &str) -> PathBuf {
        self.base.join(sanitize_for_path(company))
    }

    /// Writes `payload` to `dir/file_name`, suffixing the name if it is taken
    fn write_document(
        &self,
        dir: &Path,
        file_name: &str,
        payload: &serde_json::Value,
    ) -> StorageResult<String> {
        let body = serde_json::to_vec_pretty(payload)?;
        let path = with_retry(self.retry, "local document write", || {
            fs::create_dir_all(dir)?;
            let path = unique_path(dir, file_name);
            fs::write(&path, &body)?;
            Ok(path)
        })?;
        debug!("Wrote {} bytes to {}", body.len(), path.display());
        location_for(&path)
    }

    fn path_for(&self, location: &str) -> StorageResult<PathBuf> {
        let url =
            Url::parse(location).map_err(|_| StorageError::InvalidLocation(location.to_string()))?;
        if url.scheme() != "file" {
            return Err(StorageError::InvalidLocation(location.to_string()));
        }
        let path = url
            .to_file_path()
            .map_err(|_| StorageError::InvalidLocation(location.to_string()))?;
        if !path.starts_with(&self.base) {
            return Err(StorageError::InvalidLocation(location.to_string()));
        }
        Ok(path)
    }
}

impl DocumentStore for LocalStore {
    fn kind(&self) -> &'static str {
        "local"
    }

    fn prepare_company(&self, company: &str) -> StorageResult<()> {
        let dir = self.company_dir(company);
        for data_type in DataType::ALL {
            fs::create_dir_all(dir.join(data_type.as_str()))?;
        }
        fs::create_dir_all(dir.join(ERRORS_FOLDER))?;
        Ok(())
    }

    fn store(
        &self,
        company: &str,
        data_type: DataType,
        payload: &serde_json::Value,
    ) -> StorageResult<String> {
        let dir = self.company_dir(company).join(data_type.as_str());
        let file_name = document_file_name(company, data_type.as_str(), Utc::now());
        self.write_document(&dir, &file_name, payload)
    }

    fn store_error(&self, company: &str, payload: &serde_json::Value) -> StorageResult<String> {
        let dir = self.company_dir(company).join(ERRORS_FOLDER);
        let file_name = error_file_name(company, Utc::now());
        self.write_document(&dir, &file_name, payload)
    }

    fn list_documents(
        &self,
        company: &str,
        data_type: Option<DataType>,
    ) -> StorageResult<Vec<StoredDocument>> {
        let company_dir = self.company_dir(company);
        let company_key = sanitize_for_path(company);
        let folders: Vec<&str> = match data_type {
            Some(t) => vec![t.as_str()],
            None => DataType::ALL.iter().map(|t| t.as_str()).collect(),
        };

        let mut documents = Vec::new();
        for folder in folders {
            let dir = company_dir.join(folder);
            if !dir.is_dir() {
                continue;
            }
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let meta = entry.metadata()?;
                let last_modified = meta
                    .modified()
                    .map(|t| DateTime::<Utc>::from(t).to_rfc3339())
                    .unwrap_or_default();
                documents.push(StoredDocument {
                    key: format!(
                        "{}/{}/{}",
                        company_key,
                        folder,
                        entry.file_name().to_string_lossy()
                    ),
                    size: meta.len(),
                    last_modified,
                    location: location_for(&path)?,
                });
            }
        }
        documents.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(documents)
    }

    fn load(&self, location: &str) -> StorageResult<serde_json::Value> {
        let path = self.path_for(location)?;
        if !path.is_file() {
            return Err(StorageError::NotFound(location.to_string()));
        }
        let body = fs::read(&path)?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn delete(&self, location: &str) -> StorageResult<bool> {
        let path = self.path_for(location)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// `dir/name`, or `dir/<stem>_<n>.json` for the first free `n`
fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    let stem = file_name.strip_suffix(".json").unwrap_or(file_name);
    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{}_{}.json", stem, n));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

fn location_for(path: &Path) -> StorageResult<String> {
    Url::from_file_path(path)
        .map(String::from)
        .map_err(|_| StorageError::InvalidLocation(path.display().to_string()))
}
