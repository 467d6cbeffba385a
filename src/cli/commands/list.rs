//! List command.

use console::style;

use docintake::config::Settings;
use docintake::repository::DocumentStore;
use docintake::utils::{format_size, mime_icon, truncate_chars};

use crate::cli::helpers;

pub fn cmd_list(settings: &Settings) -> anyhow::Result<()> {
    let store = helpers::open_store(settings)?;
    let docs = store.list_documents()?;

    if docs.is_empty() {
        println!("{} No documents yet", style("!").yellow());
        println!("  Add one with {}", style("docintake add <file>").cyan());
        return Ok(());
    }

    println!(
        "{:>6}  {:<5} {:<40} {:>9}  {:<12} {}",
        style("ID").bold(),
        "",
        style("TITLE").bold(),
        style("SIZE").bold(),
        style("TYPE").bold(),
        style("ADDED").bold()
    );
    for doc in &docs {
        let doc_type = doc
            .hints
            .as_ref()
            .and_then(|h| h.document_type)
            .map(|t| t.as_str())
            .unwrap_or("-");
        println!(
            "{:>6}  {:<5} {:<40} {:>9}  {:<12} {}",
            doc.id,
            mime_icon(&doc.mime_type),
            truncate_chars(&doc.title, 40),
            format_size(doc.size_bytes.max(0) as u64),
            doc_type,
            doc.created_at.format("%Y-%m-%d")
        );
    }
    println!();
    println!("{} document(s)", docs.len());

    Ok(())
}
