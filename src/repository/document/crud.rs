//! Basic create, read, and update operations for documents.

use std::path::PathBuf;

use chrono::Utc;
use rusqlite::params;
use tracing::debug;

use super::helpers::{row_to_document, sanitize_filename, OptionalExt, DOCUMENT_COLUMNS};
use super::DocumentRepository;
use crate::models::Document;
use crate::repository::{Result, StoreError};

impl DocumentRepository {
    /// Get a document by ID.
    pub fn get(&self, id: i64) -> Result<Option<Document>> {
        let conn = self.connect()?;
        let sql = format!("SELECT {} FROM documents WHERE id = ?", DOCUMENT_COLUMNS);
        let doc = conn
            .query_row(&sql, params![id], row_to_document)
            .optional()?;
        Ok(doc)
    }

    /// All documents, newest first.
    pub fn list(&self) -> Result<Vec<Document>> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT {} FROM documents ORDER BY created_at DESC, id DESC",
            DOCUMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let docs = stmt
            .query_map([], row_to_document)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(docs)
    }

    /// Insert a document and its file content in one transaction.
    pub fn insert(&self, doc: &Document, data: &[u8]) -> Result<i64> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let hints = doc.hints.as_ref().map(serde_json::to_string).transpose()?;
        tx.execute(
            r#"INSERT INTO documents
               (title, file_name, mime_type, size_bytes, notes, extracted_text,
                ocr_text, ocr_tsv, hints, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"#,
            params![
                doc.title,
                doc.file_name,
                doc.mime_type,
                doc.size_bytes,
                doc.notes,
                doc.extracted_text,
                doc.ocr_text,
                doc.ocr_tsv,
                hints,
                doc.created_at.to_rfc3339(),
                doc.updated_at.to_rfc3339(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO document_files (document_id, data) VALUES (?1, ?2)",
            params![id, data],
        )?;
        tx.commit()?;
        debug!(id, file = %doc.file_name, "inserted document");
        Ok(id)
    }

    /// Save the editable fields of an existing document.
    pub fn update(&self, doc: &Document) -> Result<()> {
        let conn = self.connect()?;
        let hints = doc.hints.as_ref().map(serde_json::to_string).transpose()?;
        let changed = conn.execute(
            r#"UPDATE documents
               SET title = ?1, notes = ?2, extracted_text = ?3, ocr_text = ?4,
                   ocr_tsv = ?5, hints = ?6, updated_at = ?7
               WHERE id = ?8"#,
            params![
                doc.title,
                doc.notes,
                doc.extracted_text,
                doc.ocr_text,
                doc.ocr_tsv,
                hints,
                Utc::now().to_rfc3339(),
                doc.id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(doc.id));
        }
        Ok(())
    }

    /// Store OCR output for a document.
    pub fn set_ocr(&self, id: i64, text: &str, tsv: &str) -> Result<()> {
        let conn = self.connect()?;
        let changed = conn.execute(
            "UPDATE documents SET ocr_text = ?1, ocr_tsv = ?2, updated_at = ?3 WHERE id = ?4",
            params![text, tsv, Utc::now().to_rfc3339(), id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    /// Raw file content of a document.
    pub fn file_data(&self, id: i64) -> Result<Vec<u8>> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT data FROM document_files WHERE document_id = ?",
            params![id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or(StoreError::NotFound(id))
    }

    /// Write the document's file under the cache directory, reusing an
    /// existing copy of the same size.
    pub fn cached_copy(&self, id: i64) -> Result<PathBuf> {
        let doc = self.get(id)?.ok_or(StoreError::NotFound(id))?;
        let path = self
            .cache_dir
            .join(format!("{}-{}", id, sanitize_filename(&doc.file_name)));

        if let Ok(meta) = std::fs::metadata(&path) {
            if meta.len() == doc.size_bytes as u64 {
                return Ok(path);
            }
        }

        let data = self.file_data(id)?;
        std::fs::create_dir_all(&self.cache_dir)?;
        std::fs::write(&path, &data)?;
        debug!(id, path = %path.display(), "wrote cached copy");
        Ok(path)
    }
}
