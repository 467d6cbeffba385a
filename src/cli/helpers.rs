//! Helper utilities for CLI commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use console::style;

use docintake::config::{Config, Settings};
use docintake::llm::{ChatClient, LlmClient, LlmConfig};
use docintake::models::{ExtractionHints, KnownEntities};
use docintake::ocr::{Capabilities, TesseractOcr, TextExtractor};
use docintake::repository::{DocumentRepository, DocumentStore};
use docintake::services::{Pipeline, PipelineResult};
use docintake::utils::detect_mime;

/// A file read from disk for intake.
pub struct InputFile {
    pub data: Vec<u8>,
    pub file_name: String,
    pub mime: String,
}

/// Read a file and detect its MIME type.
pub async fn read_input(path: &Path) -> anyhow::Result<InputFile> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime = detect_mime(&data, &file_name);
    Ok(InputFile {
        data,
        file_name,
        mime,
    })
}

/// Open the document store, creating the database if needed.
pub fn open_store(settings: &Settings) -> anyhow::Result<DocumentRepository> {
    DocumentRepository::new(&settings.database_path(), &settings.cache_dir()).with_context(|| {
        format!(
            "Failed to open database at {}",
            settings.database_path().display()
        )
    })
}

/// Known entity names, or none when no database exists yet.
pub fn known_entities(settings: &Settings) -> KnownEntities {
    if !settings.database_path().exists() {
        return KnownEntities::default();
    }
    match open_store(settings).and_then(|repo| Ok(repo.list_known_entity_names()?)) {
        Ok(known) => known,
        Err(e) => {
            tracing::warn!("Could not load known entities: {}", e);
            KnownEntities::default()
        }
    }
}

/// Model client for the configured provider, if enabled.
pub fn llm_client(config: &LlmConfig) -> Option<Arc<dyn ChatClient>> {
    LlmClient::from_config(config).map(|client| Arc::new(client) as Arc<dyn ChatClient>)
}

/// Build a pipeline from config with tools probed once for the process.
pub fn build_pipeline(config: &Config, known: KnownEntities) -> Pipeline {
    let extraction = &config.extraction;
    let caps = Capabilities::detect(&extraction.tools);
    let extractor =
        TextExtractor::new(extraction.tools.clone(), caps).with_timeout(extraction.text_timeout());
    let ocr = TesseractOcr::with_config(extraction.tools.clone(), extraction.ocr_config());

    let mut pipeline = Pipeline::new(extractor, ocr, caps)
        .with_known_entities(known)
        .with_max_content_chars(extraction.max_content_chars);
    if let Some(llm) = llm_client(&config.llm) {
        pipeline = pipeline.with_llm(llm);
    }
    pipeline
}

/// Print stage failures from a pipeline run.
pub fn print_stage_errors(result: &PipelineResult) {
    for error in &result.errors {
        println!(
            "  {} {} stage: {}",
            style("!").yellow(),
            error.stage(),
            error
        );
    }
}

/// Print hints as aligned label/value lines.
pub fn print_hints(hints: &ExtractionHints) {
    let lines = hints.display_lines();
    if lines.is_empty() {
        println!("  {}", style("(no hints)").dim());
        return;
    }
    for (label, value) in lines {
        println!("  {:<12} {}", style(format!("{}:", label)).cyan(), value);
    }
}
