//! Tools command: report extraction capabilities.

use console::style;

use docintake::config::Config;
use docintake::llm::LlmClient;
use docintake::ocr::Capabilities;

pub async fn cmd_tools(config: &Config) -> anyhow::Result<()> {
    let tools = &config.extraction.tools;
    let caps = Capabilities::detect(tools);

    println!("{}", style("EXTRACTION TOOLS").cyan().bold());
    for (name, found) in caps.report(tools) {
        let mark = if found {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!("  {} {}", mark, name);
    }
    println!(
        "  PDF text layer: {}   scanned PDFs: {}   images: {}",
        yes_no(caps.has_pdftotext()),
        yes_no(caps.ocr_for_pdf()),
        yes_no(caps.ocr_for_images())
    );
    println!();

    let llm = &config.llm;
    println!("{}", style("LLM").cyan().bold());
    if !llm.enabled {
        println!("  {} disabled (set LLM_ENABLED=true)", style("-").dim());
        return Ok(());
    }
    println!("  Provider: {}", llm.provider.as_str());
    println!("  Endpoint: {}", llm.endpoint);
    println!("  Model:    {}", llm.effective_model());

    let reachable = match LlmClient::from_config(llm) {
        Some(client) => client.is_available().await,
        None => false,
    };
    if reachable {
        println!("  {} reachable", style("✓").green());
    } else {
        println!("  {} not reachable", style("✗").red());
    }
    Ok(())
}

fn yes_no(value: bool) -> console::StyledObject<&'static str> {
    if value {
        style("yes").green()
    } else {
        style("no").yellow()
    }
}
