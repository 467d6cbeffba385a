//! Extract command: run the pipeline on a file and print the result.

use std::path::Path;

use console::style;

use docintake::config::{Config, Settings};
use docintake::utils::{format_size, truncate_chars};

use crate::cli::helpers;

/// Characters of each text shown in plain output.
const PREVIEW_CHARS: usize = 600;

pub async fn cmd_extract(
    settings: &Settings,
    config: &Config,
    file: &Path,
    json: bool,
) -> anyhow::Result<()> {
    let input = helpers::read_input(file).await?;
    let pipeline = helpers::build_pipeline(config, helpers::known_entities(settings));
    let result = pipeline
        .run(&input.data, &input.file_name, &input.mime)
        .await;

    if json {
        let output = serde_json::json!({
            "file": input.file_name,
            "mime_type": input.mime,
            "size_bytes": input.data.len(),
            "text": result.extracted_text,
            "ocr_used": result.ocr_used,
            "ocr_text": result.ocr_text,
            "llm_used": result.llm_used,
            "hints": result.hints,
            "errors": result.errors.iter().map(|e| serde_json::json!({
                "stage": e.stage(),
                "message": e.to_string(),
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let separator = "─".repeat(70);
    println!();
    println!(
        "{} {} ({})",
        style(&input.file_name).bold(),
        style(&input.mime).dim(),
        format_size(input.data.len() as u64)
    );
    println!("{}", separator);

    println!("{}", style("TEXT").cyan().bold());
    if result.extracted_text.trim().is_empty() {
        println!("  {}", style("(none)").dim());
    } else {
        println!("{}", truncate_chars(&result.extracted_text, PREVIEW_CHARS));
    }
    println!();

    if result.ocr_used {
        println!("{}", style("OCR").cyan().bold());
        println!("{}", truncate_chars(&result.ocr_text, PREVIEW_CHARS));
        println!();
    }

    if let Some(hints) = &result.hints {
        println!("{}", style("HINTS").cyan().bold());
        helpers::print_hints(hints);
        println!();
    }

    if result.has_errors() {
        println!("{}", style("ERRORS").red().bold());
        helpers::print_stage_errors(&result);
    }
    println!("{}", separator);

    Ok(())
}
