//! Progress events for incremental OCR.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::backend::{OcrError, OcrOutput};

/// Which phase produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrPhase {
    /// PDF pages were converted to images.
    Rasterize,
    /// A page was recognized.
    Ocr,
}

impl OcrPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrPhase::Rasterize => "rasterize",
            OcrPhase::Ocr => "ocr",
        }
    }
}

/// One progress report from an OCR run.
///
/// Events arrive in increasing page order. The last event of a run has
/// `done == true` and carries either the merged text/table or the error.
#[derive(Debug)]
pub struct OcrProgress {
    pub phase: OcrPhase,
    /// 1-based page for `Ocr` events, 0 otherwise.
    pub page: usize,
    pub total: usize,
    pub done: bool,
    /// Page text for `Ocr` events; merged text on the final event.
    pub text: String,
    /// Merged token table on the final event.
    pub tsv: String,
    /// Non-fatal failure for this page; the page contributes nothing.
    pub page_error: Option<String>,
    /// Fatal error, only ever set on the final event.
    pub error: Option<OcrError>,
}

impl OcrProgress {
    pub fn rasterized(total: usize) -> Self {
        Self {
            phase: OcrPhase::Rasterize,
            page: 0,
            total,
            done: false,
            text: String::new(),
            tsv: String::new(),
            page_error: None,
            error: None,
        }
    }

    pub fn page(page: usize, total: usize, text: String) -> Self {
        Self {
            phase: OcrPhase::Ocr,
            page,
            total,
            done: false,
            text,
            tsv: String::new(),
            page_error: None,
            error: None,
        }
    }

    pub fn page_failed(page: usize, total: usize, error: String) -> Self {
        Self {
            page_error: Some(error),
            ..Self::page(page, total, String::new())
        }
    }

    pub fn finished(result: Result<OcrOutput, OcrError>) -> Self {
        let (output, error) = match result {
            Ok(output) => (output, None),
            Err(e) => (OcrOutput::default(), Some(e)),
        };
        Self {
            phase: OcrPhase::Ocr,
            page: output.pages,
            total: output.pages,
            done: true,
            text: output.text,
            tsv: output.tsv,
            page_error: None,
            error,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.error.as_ref().is_some_and(OcrError::is_cancelled)
    }
}

/// Sending side of a progressive OCR run. Checks the token before every send
/// so a cancelled run stops at the next boundary.
pub(crate) struct ProgressReporter {
    tx: mpsc::Sender<OcrProgress>,
    cancel: CancellationToken,
}

impl ProgressReporter {
    pub(crate) fn new(tx: mpsc::Sender<OcrProgress>, cancel: CancellationToken) -> Self {
        Self { tx, cancel }
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fail with `Cancelled` if the run should stop.
    pub(crate) fn check(&self) -> Result<(), OcrError> {
        if self.cancel.is_cancelled() || self.tx.is_closed() {
            Err(OcrError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub(crate) async fn send(&self, progress: OcrProgress) -> Result<(), OcrError> {
        self.check()?;
        self.tx
            .send(progress)
            .await
            .map_err(|_| OcrError::Cancelled)
    }

    /// Emit the terminal event. A fired token always wins over the result.
    pub(crate) async fn finish(self, result: Result<OcrOutput, OcrError>) {
        let result = if self.cancel.is_cancelled() {
            Err(OcrError::Cancelled)
        } else {
            result
        };
        // The receiver may already be gone; nothing left to report to.
        let _ = self.tx.send(OcrProgress::finished(result)).await;
    }
}
