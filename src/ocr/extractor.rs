//! Text layer extraction using pdftotext.

use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::command::{run_tool, ToolError};
use super::tools::{Capabilities, ToolPaths};
use crate::utils::{is_pdf, is_text};

/// Default hard limit for a single pdftotext run.
pub const DEFAULT_TEXT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur during text extraction.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Extraction timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("Extraction cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ToolError> for ExtractionError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::NotFound(tool) => ExtractionError::ToolNotFound(tool),
            ToolError::TimedOut { after, .. } => ExtractionError::TimedOut(after),
            ToolError::Cancelled => ExtractionError::Cancelled,
            ToolError::Io(e) => ExtractionError::Io(e),
            failed @ ToolError::Failed { .. } => {
                ExtractionError::ExtractionFailed(failed.to_string())
            }
        }
    }
}

/// Pulls a plain-text layer out of uploaded files.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    tools: ToolPaths,
    caps: Capabilities,
    timeout: Duration,
}

impl TextExtractor {
    /// Create a new text extractor.
    pub fn new(tools: ToolPaths, caps: Capabilities) -> Self {
        Self {
            tools,
            caps,
            timeout: DEFAULT_TEXT_TIMEOUT,
        }
    }

    /// Set the pdftotext timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Extract text based on MIME type.
    ///
    /// - `text/*`: decoded and normalized, never fails
    /// - PDF: `pdftotext -layout`, or empty text when pdftotext is missing
    /// - anything else: empty text
    pub async fn extract(&self, data: &[u8], mime: &str) -> Result<String, ExtractionError> {
        if is_text(mime) {
            return Ok(normalize_whitespace(&String::from_utf8_lossy(data)));
        }
        if !is_pdf(mime) {
            return Ok(String::new());
        }
        if !self.caps.has_pdftotext() {
            tracing::debug!("pdftotext not available, skipping text layer");
            return Ok(String::new());
        }

        let mut scratch = tempfile::Builder::new().suffix(".pdf").tempfile()?;
        std::io::Write::write_all(&mut scratch, data)?;

        let mut cmd = Command::new(&self.tools.pdftotext);
        cmd.args(["-layout", "-enc", "UTF-8"])
            .arg(scratch.path())
            .arg("-"); // Output to stdout

        let raw = run_tool(cmd, &CancellationToken::new(), Some(self.timeout)).await?;
        Ok(normalize_whitespace(&raw))
    }
}

/// Normalize extracted text.
///
/// Runs of horizontal whitespace become one space, every line is trimmed,
/// three or more consecutive newlines collapse to two, and the result is
/// trimmed.
pub fn normalize_whitespace(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut prev_blank = false;

    for line in text.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        let blank = collapsed.is_empty();
        if blank && prev_blank {
            continue;
        }
        prev_blank = blank;
        lines.push(collapsed);
    }

    lines.join("\n").trim().to_string()
}
