//! Shared helper utilities for the document repository.

use rusqlite::Row;

use crate::models::{Document, ExtractionHints};
use crate::repository::parse_datetime;

pub(crate) const DOCUMENT_COLUMNS: &str = "id, title, file_name, mime_type, size_bytes, notes, \
     extracted_text, ocr_text, ocr_tsv, hints, created_at, updated_at";

/// Map a row selected with [`DOCUMENT_COLUMNS`].
pub(crate) fn row_to_document(row: &Row) -> rusqlite::Result<Document> {
    let hints: Option<String> = row.get("hints")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    Ok(Document {
        id: row.get("id")?,
        title: row.get("title")?,
        file_name: row.get("file_name")?,
        mime_type: row.get("mime_type")?,
        size_bytes: row.get("size_bytes")?,
        notes: row.get("notes")?,
        extracted_text: row.get("extracted_text")?,
        ocr_text: row.get("ocr_text")?,
        ocr_tsv: row.get("ocr_tsv")?,
        // Unreadable hints are dropped rather than failing the whole row
        hints: hints.and_then(|h| serde_json::from_str::<ExtractionHints>(&h).ok()),
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

pub(crate) trait OptionalExt<T> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Sanitize a filename for use on the filesystem.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.');
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned.to_string()
    }
}
