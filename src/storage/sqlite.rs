//! SQLite document store
//!
//! All documents live in one `documents` table. Locations have the form
//! `sqlite://<database path>#<row id>`.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    DataType, DocumentStore, StorageError, StorageResult, StoredDocument, ERRORS_FOLDER,
};
use crate::storage::{
    document_file_name, error_file_name, sanitize_for_path, with_retry, RetryPolicy,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const LOCATION_SCHEME: &str = "sqlite://";

/// SQLite storage backend
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: String,
    retry: RetryPolicy,
}

impl SqliteStore {
    /// Opens or creates the database file, creating parent directories
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.display().to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: ":memory:".to_string(),
            retry: RetryPolicy::immediate(0),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }

    fn insert(
        &self,
        company: &str,
        folder: &str,
        file_name: &str,
        payload: &serde_json::Value,
    ) -> StorageResult<String> {
        let body = serde_json::to_string_pretty(payload)?;
        let company = sanitize_for_path(company);
        let id = with_retry(self.retry, "sqlite document insert", || {
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO documents (company, data_type, file_name, payload, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![company, folder, file_name, body, Utc::now().to_rfc3339()],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        Ok(self.location(id))
    }

    fn location(&self, id: i64) -> String {
        format!("{}{}#{}", LOCATION_SCHEME, self.db_path, id)
    }

    /// Extracts the row id from a location that belongs to this database
    fn row_id(&self, location: &str) -> StorageResult<i64> {
        let invalid = || StorageError::InvalidLocation(location.to_string());
        let rest = location.strip_prefix(LOCATION_SCHEME).ok_or_else(invalid)?;
        let (path, id) = rest.rsplit_once('#').ok_or_else(invalid)?;
        if path != self.db_path {
            return Err(invalid());
        }
        id.parse().map_err(|_| invalid())
    }
}

impl DocumentStore for SqliteStore {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    fn prepare_company(&self, _company: &str) -> StorageResult<()> {
        Ok(())
    }

    fn store(
        &self,
        company: &str,
        data_type: DataType,
        payload: &serde_json::Value,
    ) -> StorageResult<String> {
        let file_name = document_file_name(company, data_type.as_str(), Utc::now());
        self.insert(company, data_type.as_str(), &file_name, payload)
    }

    fn store_error(&self, company: &str, payload: &serde_json::Value) -> StorageResult<String> {
        let file_name = error_file_name(company, Utc::now());
        self.insert(company, ERRORS_FOLDER, &file_name, payload)
    }

    fn list_documents(
        &self,
        company: &str,
        data_type: Option<DataType>,
    ) -> StorageResult<Vec<StoredDocument>> {
        let company = sanitize_for_path(company);
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, data_type, file_name, length(payload), created_at
             FROM documents
             WHERE company = ?1 AND data_type != ?2 AND (?3 IS NULL OR data_type = ?3)
             ORDER BY data_type, file_name, id",
        )?;

        let rows = stmt
            .query_map(
                params![company, ERRORS_FOLDER, data_type.map(|t| t.as_str())],
                |row| {
                    let id: i64 = row.get(0)?;
                    let folder: String = row.get(1)?;
                    let file_name: String = row.get(2)?;
                    let size: i64 = row.get(3)?;
                    let created_at: String = row.get(4)?;
                    Ok((id, folder, file_name, size, created_at))
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .map(|(id, folder, file_name, size, created_at)| StoredDocument {
                key: format!("{}/{}/{}", company, folder, file_name),
                size: size.max(0) as u64,
                last_modified: created_at,
                location: self.location(id),
            })
            .collect())
    }

    fn load(&self, location: &str) -> StorageResult<serde_json::Value> {
        let id = self.row_id(location)?;
        let conn = self.lock()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM documents WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let payload = payload.ok_or_else(|| StorageError::NotFound(location.to_string()))?;
        Ok(serde_json::from_str(&payload)?)
    }

    fn delete(&self, location: &str) -> StorageResult<bool> {
        let id = self.row_id(location)?;
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }
}
