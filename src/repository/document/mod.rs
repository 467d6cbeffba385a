//! Document repository for SQLite persistence.
//!
//! - `schema`: table creation
//! - `crud`: documents and their file content
//! - `entities`: vendor / project / appliance names
//! - `helpers`: row mapping and file name utilities

mod crud;
mod entities;
mod helpers;
mod schema;

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use super::{DocumentStore, Result, StoreError};
use crate::models::{Document, EntityKind, KnownEntities};

pub use helpers::sanitize_filename;

/// SQLite-backed document repository.
pub struct DocumentRepository {
    pub(crate) db_path: PathBuf,
    pub(crate) cache_dir: PathBuf,
}

impl DocumentRepository {
    /// Open (creating if needed) the database at `db_path`. Cached copies of
    /// stored files are written under `cache_dir`.
    pub fn new(db_path: &Path, cache_dir: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let repo = Self {
            db_path: db_path.to_path_buf(),
            cache_dir: cache_dir.to_path_buf(),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    pub(crate) fn connect(&self) -> Result<Connection> {
        super::connect(&self.db_path)
    }

    /// Get the database path.
    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    /// Get the cache directory path.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

impl DocumentStore for DocumentRepository {
    fn extract_cached_copy(&self, id: i64) -> Result<PathBuf> {
        self.cached_copy(id)
    }

    fn update_ocr(&self, id: i64, text: &str, tsv: &str) -> Result<()> {
        self.set_ocr(id, text, tsv)
    }

    fn get_document(&self, id: i64) -> Result<Document> {
        self.get(id)?.ok_or(StoreError::NotFound(id))
    }

    fn update_document(&self, doc: &Document) -> Result<()> {
        self.update(doc)
    }

    fn list_known_entity_names(&self) -> Result<KnownEntities> {
        self.known_entity_names()
    }

    fn insert_document(&self, doc: &Document, data: &[u8]) -> Result<i64> {
        self.insert(doc, data)
    }

    fn list_documents(&self) -> Result<Vec<Document>> {
        self.list()
    }

    fn add_entity(&self, kind: EntityKind, name: &str) -> Result<()> {
        DocumentRepository::add_entity(self, kind, name)
    }
}
