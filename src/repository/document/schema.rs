//! Database schema initialization.

use super::DocumentRepository;
use crate::repository::Result;

impl DocumentRepository {
    /// Initialize the database schema.
    pub(crate) fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                file_name TEXT NOT NULL,
                mime_type TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                notes TEXT NOT NULL DEFAULT '',
                extracted_text TEXT NOT NULL DEFAULT '',
                ocr_text TEXT,
                ocr_tsv TEXT,
                hints TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS document_files (
                document_id INTEGER PRIMARY KEY,
                data BLOB NOT NULL,
                FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS entities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (kind, name)
            );

            CREATE INDEX IF NOT EXISTS idx_entities_kind ON entities(kind);
        "#,
        )?;
        Ok(())
    }
}
