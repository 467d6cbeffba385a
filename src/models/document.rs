//! Stored document records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ExtractionHints;

/// A document kept in the store, with whatever extraction results were
/// accepted for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Database row ID.
    pub id: i64,
    /// Display title.
    pub title: String,
    /// Original file name.
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    /// Free-form notes.
    pub notes: String,
    /// Text extracted at intake (text layer or plain text).
    pub extracted_text: String,
    /// Accepted OCR text.
    pub ocr_text: Option<String>,
    /// Accepted OCR token table (Tesseract TSV).
    pub ocr_tsv: Option<String>,
    /// Accepted model hints.
    pub hints: Option<ExtractionHints>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Create a new, unsaved document.
    pub fn new(title: String, file_name: String, mime_type: String, size_bytes: i64) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Set by database
            title,
            file_name,
            mime_type,
            size_bytes,
            notes: String::new(),
            extracted_text: String::new(),
            ocr_text: None,
            ocr_tsv: None,
            hints: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Best text available for display or search: OCR text when the text
    /// layer is empty.
    pub fn best_text(&self) -> &str {
        if self.extracted_text.trim().is_empty() {
            self.ocr_text.as_deref().unwrap_or("")
        } else {
            &self.extracted_text
        }
    }

    /// Fold accepted hints into the record.
    ///
    /// The title is only replaced while it is still blank or the bare file
    /// name, and notes only while empty, so user edits win.
    pub fn apply_hints(&mut self, hints: &ExtractionHints) {
        let suggestion = hints.title_suggestion.trim();
        if !suggestion.is_empty()
            && (self.title.trim().is_empty() || self.title == self.file_name)
        {
            self.title = suggestion.to_string();
        }

        if self.notes.trim().is_empty() {
            let summary = hints.summary.trim();
            let notes = hints.notes.trim();
            self.notes = match (summary.is_empty(), notes.is_empty()) {
                (false, false) => format!("{}\n\n{}", summary, notes),
                (false, true) => summary.to_string(),
                (true, false) => notes.to_string(),
                (true, true) => String::new(),
            };
        }

        self.hints = Some(hints.clone());
        self.updated_at = Utc::now();
    }
}

/// Names of existing records, offered to the model for exact reuse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownEntities {
    pub vendors: Vec<String>,
    pub projects: Vec<String>,
    pub appliances: Vec<String>,
}

impl KnownEntities {
    pub fn is_empty(&self) -> bool {
        self.vendors.is_empty() && self.projects.is_empty() && self.appliances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::new(
            "scan_0001.pdf".to_string(),
            "scan_0001.pdf".to_string(),
            "application/pdf".to_string(),
            1024,
        )
    }

    #[test]
    fn test_apply_hints_fills_defaults() {
        let mut d = doc();
        let hints = ExtractionHints {
            title_suggestion: "Water heater invoice".to_string(),
            summary: "Replacement of 50 gal heater".to_string(),
            ..Default::default()
        };
        d.apply_hints(&hints);
        assert_eq!(d.title, "Water heater invoice");
        assert_eq!(d.notes, "Replacement of 50 gal heater");
        assert_eq!(d.hints.as_ref(), Some(&hints));
    }

    #[test]
    fn test_apply_hints_keeps_user_edits() {
        let mut d = doc();
        d.title = "My title".to_string();
        d.notes = "mine".to_string();
        d.apply_hints(&ExtractionHints {
            title_suggestion: "Other".to_string(),
            summary: "Other".to_string(),
            ..Default::default()
        });
        assert_eq!(d.title, "My title");
        assert_eq!(d.notes, "mine");
    }

    #[test]
    fn test_best_text() {
        let mut d = doc();
        assert_eq!(d.best_text(), "");
        d.ocr_text = Some("scanned".to_string());
        assert_eq!(d.best_text(), "scanned");
        d.extracted_text = "layer".to_string();
        assert_eq!(d.best_text(), "layer");
    }
}
