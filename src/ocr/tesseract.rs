//! Tesseract OCR engine.
//!
//! PDFs are rasterized with pdftoppm into a scratch directory and each page
//! image is recognized with `tesseract ... tsv`, so every run yields both
//! text and a token table. Two entry points share the page primitive:
//! [`TesseractOcr::ocr`] runs to completion, [`TesseractOcr::ocr_with_progress`]
//! reports each page on a channel as it finishes.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backend::{OcrConfig, OcrError, OcrOutput, PageOcr};
use super::command::{run_tool, ToolError};
use super::progress::{OcrProgress, ProgressReporter};
use super::tools::ToolPaths;
use super::tsv::{text_from_tsv, PageAccumulator};
use crate::utils::{is_image, is_pdf};

/// Tesseract-backed OCR engine.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    tools: ToolPaths,
    config: OcrConfig,
}

impl TesseractOcr {
    /// Create an engine with default configuration.
    pub fn new(tools: ToolPaths) -> Self {
        Self {
            tools,
            config: OcrConfig::default(),
        }
    }

    /// Create an engine with custom configuration.
    pub fn with_config(tools: ToolPaths, config: OcrConfig) -> Self {
        Self { tools, config }
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Recognize a single raster image, returning text and the token table.
    pub async fn ocr_page_image(
        &self,
        image_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<PageOcr, OcrError> {
        let mut cmd = Command::new(&self.tools.tesseract);
        cmd.arg(image_path)
            .arg("stdout")
            .args(["-l", &self.config.language])
            .arg("tsv");

        let tsv = run_tool(cmd, cancel, None).await?;
        let text = text_from_tsv(&tsv);
        Ok(PageOcr { text, tsv })
    }

    /// Convert up to `max_pages` PDF pages to PNG images, returned in page order.
    async fn rasterize(
        &self,
        pdf_path: &Path,
        output_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Vec<PathBuf>, OcrError> {
        let last_page = self.config.max_pages.max(1).to_string();
        let dpi = self.config.dpi.to_string();

        let mut cmd = Command::new(&self.tools.pdftoppm);
        cmd.args(["-png", "-r", &dpi, "-f", "1", "-l", &last_page])
            .arg(pdf_path)
            .arg(output_dir.join("page"));

        match run_tool(cmd, cancel, None).await {
            Ok(_) => {}
            Err(ToolError::Cancelled) => return Err(OcrError::Cancelled),
            Err(e) => return Err(OcrError::Rasterize(e.to_string())),
        }

        // pdftoppm zero-pads page numbers to a common width, so a plain sort
        // keeps page order.
        let mut images: Vec<PathBuf> = std::fs::read_dir(output_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|ext| ext == "png").unwrap_or(false))
            .collect();
        images.sort();

        if images.is_empty() {
            return Err(OcrError::Rasterize(
                "No images generated from PDF".to_string(),
            ));
        }

        debug!("Rasterized {} pages from {}", images.len(), pdf_path.display());
        Ok(images)
    }

    /// OCR a document to completion.
    ///
    /// Images are recognized directly; PDFs are rasterized and recognized page
    /// by page. Pages that fail are skipped. Other MIME types yield empty
    /// output.
    pub async fn ocr(&self, data: &[u8], mime: &str) -> Result<OcrOutput, OcrError> {
        let cancel = CancellationToken::new();

        if is_image(mime) {
            let scratch = TempDir::new()?;
            let image_path = write_input(&scratch, data, mime)?;
            let page = self.ocr_page_image(&image_path, &cancel).await?;
            return Ok(OcrOutput {
                text: page.text,
                tsv: page.tsv,
                pages: 1,
            });
        }

        if !is_pdf(mime) {
            return Ok(OcrOutput::default());
        }

        let scratch = TempDir::new()?;
        let pdf_path = write_input(&scratch, data, mime)?;
        let pages_dir = scratch.path().join("pages");
        std::fs::create_dir(&pages_dir)?;

        let images = self.rasterize(&pdf_path, &pages_dir, &cancel).await?;
        let mut pages = PageAccumulator::new();
        for (i, image) in images.iter().enumerate() {
            match self.ocr_page_image(image, &cancel).await {
                Ok(page) => pages.push(i + 1, &page),
                Err(e) => warn!("OCR failed for page {}: {}", i + 1, e),
            }
        }

        let output = pages.finish();
        info!(
            "OCR finished: {} of {} pages, {} chars",
            output.pages,
            images.len(),
            output.text.len()
        );
        Ok(output)
    }

    /// OCR a document on a background task, reporting progress per page.
    ///
    /// The returned channel yields a `rasterize` event (PDFs only), one `ocr`
    /// event per page, and a final `done` event, then closes. Cancelling the
    /// token stops the run at the next page or send boundary and kills any
    /// running subprocess; the final event then carries `OcrError::Cancelled`.
    pub fn ocr_with_progress(
        &self,
        data: Vec<u8>,
        mime: &str,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<OcrProgress> {
        let (tx, rx) = mpsc::channel(1);
        let engine = self.clone();
        let mime = mime.to_string();

        tokio::spawn(async move {
            let reporter = ProgressReporter::new(tx, cancel);
            let result = engine.run_progressive(&data, &mime, &reporter).await;
            if let Err(ref e) = result {
                if !e.is_cancelled() {
                    warn!("Progressive OCR failed: {}", e);
                }
            }
            reporter.finish(result).await;
        });

        rx
    }

    async fn run_progressive(
        &self,
        data: &[u8],
        mime: &str,
        reporter: &ProgressReporter,
    ) -> Result<OcrOutput, OcrError> {
        let cancel = reporter.cancel_token();

        if is_image(mime) {
            let scratch = TempDir::new()?;
            let image_path = write_input(&scratch, data, mime)?;
            reporter.check()?;
            let page = self.ocr_page_image(&image_path, cancel).await?;
            reporter
                .send(OcrProgress::page(1, 1, page.text.clone()))
                .await?;
            return Ok(OcrOutput {
                text: page.text,
                tsv: page.tsv,
                pages: 1,
            });
        }

        if !is_pdf(mime) {
            return Ok(OcrOutput::default());
        }

        let scratch = TempDir::new()?;
        let pdf_path = write_input(&scratch, data, mime)?;
        let pages_dir = scratch.path().join("pages");
        std::fs::create_dir(&pages_dir)?;

        let images = self.rasterize(&pdf_path, &pages_dir, cancel).await?;
        let total = images.len();
        reporter.send(OcrProgress::rasterized(total)).await?;

        let mut pages = PageAccumulator::new();
        for (i, image) in images.iter().enumerate() {
            let page_num = i + 1;
            reporter.check()?;

            match self.ocr_page_image(image, cancel).await {
                Ok(page) => {
                    pages.push(page_num, &page);
                    reporter
                        .send(OcrProgress::page(page_num, total, page.text))
                        .await?;
                }
                Err(OcrError::Cancelled) => return Err(OcrError::Cancelled),
                Err(e) => {
                    warn!("OCR failed for page {}: {}", page_num, e);
                    reporter
                        .send(OcrProgress::page_failed(page_num, total, e.to_string()))
                        .await?;
                }
            }
        }

        Ok(pages.finish())
    }
}

/// Write the input bytes into the scratch directory with a fitting extension.
fn write_input(scratch: &TempDir, data: &[u8], mime: &str) -> Result<PathBuf, OcrError> {
    let ext = if is_pdf(mime) {
        "pdf"
    } else {
        mime_guess::get_mime_extensions_str(mime)
            .and_then(|exts| exts.first().copied())
            .unwrap_or("img")
    };
    let path = scratch.path().join(format!("input.{}", ext));
    std::fs::write(&path, data)?;
    Ok(path)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::ocr::progress::OcrPhase;
    use crate::ocr::testing::FakeTools;

    #[tokio::test]
    async fn test_ocr_image_directly() {
        let fake = FakeTools::new();
        let engine = TesseractOcr::new(fake.paths());

        let out = engine.ocr(b"png bytes", "image/png").await.unwrap();
        assert_eq!(out.pages, 1);
        assert_eq!(out.text, "Scanned input");
        assert!(out.tsv.starts_with("level\t"));
    }

    #[tokio::test]
    async fn test_ocr_pdf_merges_pages() {
        let fake = FakeTools::new().with_pages(3);
        let engine = TesseractOcr::new(fake.paths());

        let out = engine.ocr(b"%PDF-1.4", "application/pdf").await.unwrap();
        assert_eq!(out.pages, 3);
        assert_eq!(out.text, "Scanned page-1\n\nScanned page-2\n\nScanned page-3");
        assert_eq!(out.tsv.lines().filter(|l| l.starts_with("level")).count(), 1);
        assert_eq!(out.tsv.lines().count(), 1 + 3 * 2);
    }

    #[tokio::test]
    async fn test_ocr_respects_page_cap() {
        let fake = FakeTools::new().with_pages(8);
        let config = OcrConfig {
            max_pages: 2,
            ..OcrConfig::default()
        };
        let engine = TesseractOcr::with_config(fake.paths(), config);

        let out = engine.ocr(b"%PDF-1.4", "application/pdf").await.unwrap();
        assert_eq!(out.pages, 2);
    }

    #[tokio::test]
    async fn test_failing_page_is_skipped() {
        let fake = FakeTools::new().with_pages(3).failing_page(2);
        let engine = TesseractOcr::new(fake.paths());

        let out = engine.ocr(b"%PDF-1.4", "application/pdf").await.unwrap();
        assert_eq!(out.pages, 2);
        assert_eq!(out.text, "Scanned page-1\n\nScanned page-3");
    }

    #[tokio::test]
    async fn test_rasterize_failure_is_fatal() {
        let fake = FakeTools::new().with_pages(0);
        let engine = TesseractOcr::new(fake.paths());

        let err = engine.ocr(b"%PDF-1.4", "application/pdf").await.unwrap_err();
        assert!(matches!(err, OcrError::Rasterize(_)));
    }

    #[tokio::test]
    async fn test_unsupported_mime_is_empty() {
        let engine = TesseractOcr::new(FakeTools::new().paths());
        let out = engine.ocr(b"PK\x03\x04", "application/zip").await.unwrap();
        assert_eq!(out, OcrOutput::default());
    }

    #[tokio::test]
    async fn test_progress_for_pdf() {
        let fake = FakeTools::new().with_pages(3);
        let engine = TesseractOcr::new(fake.paths());

        let mut rx = engine.ocr_with_progress(
            b"%PDF-1.4".to_vec(),
            "application/pdf",
            CancellationToken::new(),
        );
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(events.len(), 5);
        assert_eq!(events[0].phase, OcrPhase::Rasterize);
        assert_eq!(events[0].total, 3);
        let pages: Vec<usize> = events[1..4].iter().map(|e| e.page).collect();
        assert_eq!(pages, vec![1, 2, 3]);
        assert!(events[..4].iter().all(|e| !e.done));

        let last = &events[4];
        assert!(last.done);
        assert!(last.error.is_none());
        assert_eq!(last.text, "Scanned page-1\n\nScanned page-2\n\nScanned page-3");
    }

    #[tokio::test]
    async fn test_progress_for_image() {
        let engine = TesseractOcr::new(FakeTools::new().paths());
        let mut rx =
            engine.ocr_with_progress(b"jpg".to_vec(), "image/jpeg", CancellationToken::new());

        let first = rx.recv().await.unwrap();
        assert_eq!(first.phase, OcrPhase::Ocr);
        assert_eq!((first.page, first.total), (1, 1));
        assert!(!first.done);

        let last = rx.recv().await.unwrap();
        assert!(last.done);
        assert_eq!(last.text, "Scanned input");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_progress_reports_rasterize_failure() {
        let engine = TesseractOcr::new(FakeTools::new().with_pages(0).paths());
        let mut rx = engine.ocr_with_progress(
            b"%PDF".to_vec(),
            "application/pdf",
            CancellationToken::new(),
        );

        let only = rx.recv().await.unwrap();
        assert!(only.done);
        assert!(matches!(only.error, Some(OcrError::Rasterize(_))));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_stops_page_work() {
        let fake = FakeTools::new().with_pages(5).with_ocr_delay("0.3");
        let engine = TesseractOcr::new(fake.paths());
        let cancel = CancellationToken::new();

        let mut rx =
            engine.ocr_with_progress(b"%PDF".to_vec(), "application/pdf", cancel.clone());

        let rasterized = rx.recv().await.unwrap();
        assert_eq!(rasterized.phase, OcrPhase::Rasterize);
        let first = rx.recv().await.unwrap();
        assert_eq!(first.page, 1);

        cancel.cancel();

        let mut rest = Vec::new();
        while let Some(event) = rx.recv().await {
            rest.push(event);
        }
        assert_eq!(rest.len(), 1);
        assert!(rest[0].done);
        assert!(rest[0].is_cancelled());
        assert!(fake.ocr_calls() <= 2);
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let fake = FakeTools::new().with_pages(5);
        let engine = TesseractOcr::new(fake.paths());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut rx = engine.ocr_with_progress(b"%PDF".to_vec(), "application/pdf", cancel);
        let only = rx.recv().await.unwrap();
        assert!(only.done && only.is_cancelled());
        assert!(rx.recv().await.is_none());
        assert_eq!(fake.ocr_calls(), 0);
    }
}
