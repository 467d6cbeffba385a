//! OCR types shared by the batch and progressive engines.

use thiserror::Error;

use super::command::ToolError;

/// Errors from OCR processing.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("Rasterize failed: {0}")]
    Rasterize(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("OCR cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OcrError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OcrError::Cancelled)
    }
}

impl From<ToolError> for OcrError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::NotFound(tool) => OcrError::BackendNotAvailable(tool),
            ToolError::Cancelled => OcrError::Cancelled,
            ToolError::Io(e) => OcrError::Io(e),
            other => OcrError::OcrFailed(other.to_string()),
        }
    }
}

/// Configuration for the OCR engine.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Language for OCR (e.g., "eng", "deu").
    pub language: String,
    /// Maximum number of PDF pages to rasterize.
    pub max_pages: usize,
    /// Rasterization resolution.
    pub dpi: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            max_pages: 20,
            dpi: 300,
        }
    }
}

/// OCR output for a single raster image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageOcr {
    /// Reconstructed text.
    pub text: String,
    /// Raw token table as emitted by the engine.
    pub tsv: String,
}

/// OCR output for a whole document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OcrOutput {
    /// Page texts joined by blank lines.
    pub text: String,
    /// Merged token table (one header, all data rows).
    pub tsv: String,
    /// Pages that produced output.
    pub pages: usize,
}
