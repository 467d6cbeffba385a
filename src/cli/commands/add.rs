//! Add command: store a file with its extraction results.

use std::path::Path;

use console::style;

use docintake::config::{Config, Settings};
use docintake::models::Document;
use docintake::repository::DocumentStore;
use docintake::utils::format_size;

use crate::cli::helpers;

/// Read a file, run the pipeline over it, and store the result.
pub async fn cmd_add(
    settings: &Settings,
    config: &Config,
    file: &Path,
    title: Option<String>,
    apply_hints: bool,
) -> anyhow::Result<()> {
    let input = helpers::read_input(file).await?;
    let store = helpers::open_store(settings)?;
    let known = store.list_known_entity_names()?;

    println!(
        "{} Extracting {} ({}, {})",
        style("→").cyan(),
        input.file_name,
        input.mime,
        format_size(input.data.len() as u64)
    );

    let pipeline = helpers::build_pipeline(config, known);
    let result = pipeline
        .run(&input.data, &input.file_name, &input.mime)
        .await;

    let mut doc = Document::new(
        title.unwrap_or_else(|| input.file_name.clone()),
        input.file_name.clone(),
        input.mime.clone(),
        input.data.len() as i64,
    );
    doc.extracted_text = result.extracted_text.clone();
    if result.ocr_used {
        doc.ocr_text = Some(result.ocr_text.clone());
        doc.ocr_tsv = Some(result.ocr_tsv.clone());
    }
    if let Some(hints) = &result.hints {
        if apply_hints {
            doc.apply_hints(hints);
        } else {
            doc.hints = Some(hints.clone());
        }
    }

    let id = store.insert_document(&doc, &input.data)?;

    helpers::print_stage_errors(&result);
    println!(
        "{} Added document {} ({} chars of text{})",
        style("✓").green(),
        style(id).bold(),
        doc.best_text().chars().count(),
        if result.ocr_used { ", OCR" } else { "" }
    );
    if let Some(hints) = &result.hints {
        helpers::print_hints(hints);
        if !apply_hints {
            println!(
                "  Run {} to review and apply them",
                style(format!("docintake review {}", id)).cyan()
            );
        }
    }

    Ok(())
}
