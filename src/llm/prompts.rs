//! Prompt construction for document extraction.

use crate::models::KnownEntities;
use crate::utils::format_size;

use super::client::ChatMessage;

/// Default cap on characters of each text source sent to the model.
pub const DEFAULT_MAX_CONTENT_CHARS: usize = 12_000;

/// System prompt fixing the reply contract.
pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You extract structured metadata from household documents: quotes, invoices, receipts, manuals, warranties, permits, inspection reports and contracts.

Reply with exactly ONE JSON object and nothing else. No prose, no markdown, no code fences.

Schema (omit any field you cannot determine):
{
  "document_type": "quote" | "invoice" | "receipt" | "manual" | "warranty" | "permit" | "inspection" | "contract" | "other",
  "title_suggestion": string,
  "summary": string,
  "vendor_hint": string,
  "total": integer,
  "labor": integer,
  "materials": integer,
  "currency_unit": "cents" | "dollars",
  "date": "YYYY-MM-DD",
  "warranty_expiry": "YYYY-MM-DD",
  "entity_kind_hint": "project" | "appliance" | "vendor" | "maintenance" | "quote" | "service_log",
  "entity_name_hint": string,
  "maintenance_items": [{"name": string, "interval_months": integer}],
  "notes": string
}

Rules:
1. Money fields are integers. Set "currency_unit" to say whether they are cents or dollars. Prefer cents: $1,234.56 is 123456.
2. Dates are ISO 8601 (YYYY-MM-DD). "date" is the document's own date (issued, signed, or performed).
3. Use only the listed values for "document_type" and "entity_kind_hint".
4. "maintenance_items" lists recurring upkeep the document recommends, with the interval in whole months.
5. "title_suggestion" is short (under 60 characters) and specific, e.g. "Acme Plumbing water heater invoice"."#;

/// Everything the prompt is built from.
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub filename: &'a str,
    pub mime: &'a str,
    pub size_bytes: u64,
    pub known: &'a KnownEntities,
    /// Text layer from the PDF, if any.
    pub pdf_text: &'a str,
    /// OCR output, if any.
    pub ocr_text: &'a str,
    /// Used only when neither of the above has text.
    pub fallback_text: &'a str,
    pub max_content_chars: usize,
}

/// Build the system + user messages for one extraction request.
pub fn build_prompt(input: &PromptInput<'_>) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt(input.known)),
        ChatMessage::user(user_prompt(input)),
    ]
}

fn system_prompt(known: &KnownEntities) -> String {
    let mut prompt = EXTRACTION_SYSTEM_PROMPT.to_string();
    if known.is_empty() {
        return prompt;
    }

    prompt.push_str(
        "\n\nExisting records are listed below. When the document refers to one of them, \
         copy the name exactly into \"vendor_hint\" or \"entity_name_hint\".",
    );
    let groups = [
        ("Vendors", &known.vendors),
        ("Projects", &known.projects),
        ("Appliances", &known.appliances),
    ];
    for (label, names) in groups {
        if names.is_empty() {
            continue;
        }
        prompt.push_str(&format!("\n{}:", label));
        for name in names {
            prompt.push_str(&format!("\n- {}", name));
        }
    }
    prompt
}

fn user_prompt(input: &PromptInput<'_>) -> String {
    let mut prompt = format!(
        "Filename: {}\nMIME type: {}\nSize: {}\n\n",
        input.filename,
        input.mime,
        format_size(input.size_bytes)
    );

    let max = input.max_content_chars;
    let pdf_text = input.pdf_text.trim();
    let ocr_text = input.ocr_text.trim();
    let fallback = input.fallback_text.trim();

    if !pdf_text.is_empty() && !ocr_text.is_empty() {
        prompt.push_str("Two extractions of the same document follow.\n\n");
        prompt.push_str("--- PDF text layer ---\n");
        prompt.push_str(truncate_content(pdf_text, max));
        prompt.push_str("\n\n--- OCR text ---\n");
        prompt.push_str(truncate_content(ocr_text, max));
        prompt.push_str(
            "\n\nPrefer the PDF text layer where they disagree; use the OCR text for \
             content the text layer is missing, such as scanned pages or stamps.",
        );
    } else if !pdf_text.is_empty() {
        prompt.push_str("--- PDF text layer ---\n");
        prompt.push_str(truncate_content(pdf_text, max));
    } else if !ocr_text.is_empty() {
        prompt.push_str("--- OCR text ---\n");
        prompt.push_str(truncate_content(ocr_text, max));
    } else if !fallback.is_empty() {
        prompt.push_str("--- Document text ---\n");
        prompt.push_str(truncate_content(fallback, max));
    } else {
        prompt.push_str("No text could be extracted. Infer what you can from the filename.");
    }
    prompt
}

/// Truncate content to at most `max` characters (UTF-8 safe).
fn truncate_content(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
