//! Text extraction and OCR.
//!
//! Extracts text from documents using:
//! - pdftotext (Poppler) for the PDF text layer
//! - pdftoppm (Poppler) + Tesseract for scanned PDFs and image files
//!
//! Tool presence is probed once per process (see [`Capabilities`]); a missing
//! tool disables the step that needs it instead of failing.

mod backend;
mod command;
mod extractor;
mod progress;
mod tesseract;
mod tools;
mod tsv;

#[cfg(all(test, unix))]
pub(crate) mod testing;

pub use backend::{OcrConfig, OcrError, OcrOutput, PageOcr};
pub use command::ToolError;
pub use extractor::{normalize_whitespace, ExtractionError, TextExtractor, DEFAULT_TEXT_TIMEOUT};
pub use progress::{OcrPhase, OcrProgress};
pub use tesseract::TesseractOcr;
pub use tools::{check_binary, Capabilities, ToolPaths};
pub use tsv::{mean_confidence, text_from_tsv, TSV_HEADER};
