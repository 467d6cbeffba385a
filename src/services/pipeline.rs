//! One-shot extraction pipeline.
//!
//! Runs text extraction, OCR, and the model in sequence for a single file and
//! collects whatever each stage produced. A failing stage is recorded and the
//! run continues; `run` itself never fails.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::llm::{
    build_prompt, parse_response, ChatClient, HintParseError, LlmError, PromptInput,
    DEFAULT_MAX_CONTENT_CHARS,
};
use crate::models::{ExtractionHints, KnownEntities};
use crate::ocr::{Capabilities, ExtractionError, OcrError, TesseractOcr, TextExtractor};
use crate::utils::{is_image, is_pdf};

/// A stage failure recorded during a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("text extraction failed: {0}")]
    Text(#[from] ExtractionError),
    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),
    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),
    #[error("LLM reply unusable: {0}")]
    Parse(#[from] HintParseError),
}

impl StageError {
    /// Stage name: "text", "ocr", or "llm".
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Ocr(_) => "ocr",
            Self::Llm(_) | Self::Parse(_) => "llm",
        }
    }
}

/// Everything a pipeline run produced.
#[derive(Debug, Default)]
pub struct PipelineResult {
    /// Best plain text: the text layer, the text file, or OCR text for images.
    pub extracted_text: String,
    /// PDF text layer (empty for other types).
    pub pdf_text: String,
    pub ocr_text: String,
    pub ocr_tsv: String,
    pub hints: Option<ExtractionHints>,
    pub ocr_used: bool,
    pub llm_used: bool,
    pub errors: Vec<StageError>,
}

impl PipelineResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// All recorded failures on one line.
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Batch orchestrator over the extraction stages.
pub struct Pipeline {
    extractor: TextExtractor,
    ocr: TesseractOcr,
    caps: Capabilities,
    llm: Option<Arc<dyn ChatClient>>,
    known: KnownEntities,
    max_content_chars: usize,
}

impl Pipeline {
    pub fn new(extractor: TextExtractor, ocr: TesseractOcr, caps: Capabilities) -> Self {
        Self {
            extractor,
            ocr,
            caps,
            llm: None,
            known: KnownEntities::default(),
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
        }
    }

    /// Enable the model stage.
    pub fn with_llm(mut self, llm: Arc<dyn ChatClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Names offered to the model for reuse.
    pub fn with_known_entities(mut self, known: KnownEntities) -> Self {
        self.known = known;
        self
    }

    pub fn with_max_content_chars(mut self, max: usize) -> Self {
        self.max_content_chars = max;
        self
    }

    /// Run every applicable stage over one file.
    pub async fn run(&self, data: &[u8], filename: &str, mime: &str) -> PipelineResult {
        let mut result = PipelineResult::default();

        match self.extractor.extract(data, mime).await {
            Ok(text) => {
                debug!(chars = text.len(), "text extraction finished");
                if is_pdf(mime) {
                    result.pdf_text = text.clone();
                }
                result.extracted_text = text;
            }
            Err(e) => {
                warn!("Text extraction failed for {}: {}", filename, e);
                result.errors.push(e.into());
            }
        }

        if (is_pdf(mime) || is_image(mime)) && self.caps.ocr_for_mime(mime) {
            match self.ocr.ocr(data, mime).await {
                Ok(output) => {
                    info!(pages = output.pages, "OCR finished for {}", filename);
                    result.ocr_used = true;
                    if is_image(mime) && result.extracted_text.trim().is_empty() {
                        result.extracted_text = output.text.clone();
                    }
                    result.ocr_text = output.text;
                    result.ocr_tsv = output.tsv;
                }
                Err(e) => {
                    warn!("OCR failed for {}: {}", filename, e);
                    result.errors.push(e.into());
                }
            }
        }

        if let Some(llm) = &self.llm {
            let has_text =
                !result.extracted_text.trim().is_empty() || !result.ocr_text.trim().is_empty();
            if has_text {
                match self.extract_hints(llm.as_ref(), data.len(), filename, mime, &result).await {
                    Ok(hints) => {
                        info!("LLM hints extracted for {}", filename);
                        result.hints = Some(hints);
                        result.llm_used = true;
                    }
                    Err(e) => {
                        warn!("LLM extraction failed for {}: {}", filename, e);
                        result.errors.push(e);
                    }
                }
            } else {
                debug!("no text for {}, skipping LLM", filename);
            }
        }

        result
    }

    async fn extract_hints(
        &self,
        llm: &dyn ChatClient,
        size: usize,
        filename: &str,
        mime: &str,
        result: &PipelineResult,
    ) -> Result<ExtractionHints, StageError> {
        let messages = build_prompt(&PromptInput {
            filename,
            mime,
            size_bytes: size as u64,
            known: &self.known,
            pdf_text: &result.pdf_text,
            ocr_text: &result.ocr_text,
            fallback_text: &result.extracted_text,
            max_content_chars: self.max_content_chars,
        });
        let reply = llm.chat_complete(&messages).await?;
        Ok(parse_response(&reply)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::FakeChat;
    use crate::models::DocumentType;
    use crate::ocr::ToolPaths;

    fn degraded() -> Pipeline {
        let tools = ToolPaths::default();
        Pipeline::new(
            TextExtractor::new(tools.clone(), Capabilities::none()),
            TesseractOcr::new(tools),
            Capabilities::none(),
        )
    }

    #[tokio::test]
    async fn test_no_tools_no_llm() {
        let result = degraded().run(b"%PDF-1.4", "scan.pdf", "application/pdf").await;
        assert_eq!(result.extracted_text, "");
        assert_eq!(result.pdf_text, "");
        assert!(!result.ocr_used);
        assert!(!result.llm_used);
        assert!(result.hints.is_none());
        assert!(!result.has_errors());
    }

    #[tokio::test]
    async fn test_text_file_with_llm() {
        let chat = Arc::new(FakeChat::replying(
            r#"{"document_type":"receipt","total":"$12.50","vendor_hint":"Corner Hardware"}"#,
        ));
        let pipeline = degraded().with_llm(chat.clone());
        let result = pipeline
            .run(b"Corner  Hardware\n\n\n\nTotal $12.50", "receipt.txt", "text/plain")
            .await;

        assert_eq!(result.extracted_text, "Corner Hardware\n\nTotal $12.50");
        assert_eq!(result.pdf_text, "");
        assert!(result.llm_used);
        let hints = result.hints.unwrap();
        assert_eq!(hints.document_type, Some(DocumentType::Receipt));
        assert_eq!(hints.total_cents, Some(1250));
        assert_eq!(chat.calls(), 1);
        assert!(chat.last_prompt().contains("--- Document text ---"));
    }

    #[tokio::test]
    async fn test_no_text_skips_llm() {
        let chat = Arc::new(FakeChat::replying("{}"));
        let pipeline = degraded().with_llm(chat.clone());
        let result = pipeline.run(b"\x89PNG", "photo.png", "image/png").await;
        assert!(!result.llm_used);
        assert_eq!(chat.calls(), 0);
        assert!(!result.has_errors());
    }

    #[tokio::test]
    async fn test_llm_failures_recorded() {
        let pipeline =
            degraded().with_llm(Arc::new(FakeChat::failing(LlmError::Connection("refused".into()))));
        let result = pipeline.run(b"hello", "a.txt", "text/plain").await;
        assert_eq!(result.extracted_text, "hello");
        assert!(!result.llm_used);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].stage(), "llm");
        assert!(result.error_summary().contains("refused"));

        let pipeline = degraded().with_llm(Arc::new(FakeChat::replying("not json")));
        let result = pipeline.run(b"hello", "a.txt", "text/plain").await;
        assert!(matches!(result.errors[0], StageError::Parse(_)));
        assert!(result.hints.is_none());
    }

    #[cfg(unix)]
    mod with_tools {
        use super::*;
        use crate::ocr::testing::FakeTools;

        fn pipeline(fake: &FakeTools) -> Pipeline {
            let tools = fake.paths();
            let caps = Capabilities::probe(&tools);
            Pipeline::new(
                TextExtractor::new(tools.clone(), caps),
                TesseractOcr::new(tools),
                caps,
            )
        }

        #[tokio::test]
        async fn test_pdf_uses_both_sources() {
            let fake = FakeTools::new().with_pages(2).with_pdf_text("Invoice 42");
            let chat = Arc::new(FakeChat::replying(r#"{"document_type":"invoice"}"#));
            let result = pipeline(&fake)
                .with_llm(chat.clone())
                .run(b"%PDF-1.4", "invoice.pdf", "application/pdf")
                .await;

            assert_eq!(result.pdf_text, "Invoice 42");
            assert_eq!(result.extracted_text, "Invoice 42");
            assert!(result.ocr_used);
            assert_eq!(result.ocr_text, "Scanned page-1\n\nScanned page-2");
            assert!(result.llm_used);
            let prompt = chat.last_prompt();
            assert!(prompt.contains("--- PDF text layer ---\nInvoice 42"));
            assert!(prompt.contains("--- OCR text ---\nScanned page-1"));
        }

        #[tokio::test]
        async fn test_pdf_without_ocr_tools_uses_text_layer() {
            let fake = FakeTools::new().with_pages(2).with_pdf_text("Invoice 42");
            let tools = fake.paths();
            let caps = Capabilities {
                pdftotext: true,
                pdftoppm: false,
                tesseract: false,
            };
            let result = Pipeline::new(
                TextExtractor::new(tools.clone(), caps),
                TesseractOcr::new(tools),
                caps,
            )
            .run(b"%PDF-1.4", "invoice.pdf", "application/pdf")
            .await;

            assert_eq!(result.extracted_text, "Invoice 42");
            assert_eq!(result.pdf_text, "Invoice 42");
            assert!(!result.ocr_used);
            assert_eq!(result.ocr_text, "");
            assert!(result.errors.is_empty(), "unexpected: {}", result.error_summary());
            assert_eq!(fake.ocr_calls(), 0);
        }

        #[tokio::test]
        async fn test_image_promotes_ocr_text() {
            let fake = FakeTools::new();
            let result = pipeline(&fake).run(b"\x89PNG", "photo.png", "image/png").await;
            assert!(result.ocr_used);
            assert_eq!(result.pdf_text, "");
            assert_eq!(result.extracted_text, result.ocr_text);
            assert!(!result.extracted_text.is_empty());
        }
    }
}
