//! Repository layer for document persistence.
//!
//! Extraction code talks to the store only through [`DocumentStore`]; the
//! SQLite implementation lives in [`document`].

mod document;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::models::{Document, EntityKind, KnownEntities};

pub use document::{sanitize_filename, DocumentRepository};

/// Errors from the document store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("document {0} not found")]
    NotFound(i64),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Narrow store interface used by extraction and the CLI.
pub trait DocumentStore: Send + Sync {
    /// Write the stored file to a local cache and return its path.
    fn extract_cached_copy(&self, id: i64) -> Result<PathBuf>;

    /// Persist OCR output for a document.
    fn update_ocr(&self, id: i64, text: &str, tsv: &str) -> Result<()>;

    fn get_document(&self, id: i64) -> Result<Document>;

    /// Save title, notes, text, and hints of an existing document.
    fn update_document(&self, doc: &Document) -> Result<()>;

    /// Names of existing vendors, projects, and appliances.
    fn list_known_entity_names(&self) -> Result<KnownEntities>;

    /// Insert a new document with its file content. Returns the new ID.
    fn insert_document(&self, doc: &Document, data: &[u8]) -> Result<i64>;

    /// All documents, newest first.
    fn list_documents(&self) -> Result<Vec<Document>>;

    /// Register a named entity. Adding an existing name is a no-op.
    fn add_entity(&self, kind: EntityKind, name: &str) -> Result<()>;
}

/// Open a connection with the pragmas every repository expects.
pub(crate) fn connect(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    Ok(conn)
}

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
pub(crate) mod testing;
