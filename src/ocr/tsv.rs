//! Tesseract token table (TSV) handling.
//!
//! Columns: level, page_num, block_num, par_num, line_num, word_num, left,
//! top, width, height, conf, text.

use super::backend::{OcrOutput, PageOcr};

/// Header line tesseract writes at the top of every table.
pub const TSV_HEADER: &str =
    "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

const COLUMNS: usize = 12;

/// One recognized token.
#[derive(Debug, Clone, PartialEq)]
pub struct TsvToken<'a> {
    pub page: u32,
    pub block: u32,
    pub paragraph: u32,
    pub line: u32,
    pub confidence: f32,
    pub text: &'a str,
}

fn is_header(line: &str) -> bool {
    line.starts_with("level\t")
}

/// Parse the data rows of a table. Header and malformed rows are skipped.
pub fn parse_tokens(tsv: &str) -> impl Iterator<Item = TsvToken<'_>> {
    tsv.lines().filter_map(|line| {
        if is_header(line) {
            return None;
        }
        let cols: Vec<&str> = line.trim_end_matches('\r').splitn(COLUMNS, '\t').collect();
        if cols.len() < COLUMNS {
            return None;
        }
        Some(TsvToken {
            page: cols[1].parse().ok()?,
            block: cols[2].parse().ok()?,
            paragraph: cols[3].parse().ok()?,
            line: cols[4].parse().ok()?,
            confidence: cols[10].parse().unwrap_or(-1.0),
            text: cols[11],
        })
    })
}

/// Rebuild readable text from a token table.
///
/// Words on the same line are joined by a space, a new line within the same
/// paragraph starts a new line, and a new block or paragraph (or page) is
/// separated by a blank line. Tokens with empty text are ignored.
pub fn text_from_tsv(tsv: &str) -> String {
    let mut out = String::new();
    let mut prev: Option<(u32, u32, u32, u32)> = None;

    for token in parse_tokens(tsv) {
        let word = token.text.trim();
        if word.is_empty() {
            continue;
        }

        let key = (token.page, token.block, token.paragraph, token.line);
        if let Some((page, block, par, line)) = prev {
            if page != key.0 || block != key.1 || par != key.2 {
                out.push_str("\n\n");
            } else if line != key.3 {
                out.push('\n');
            } else {
                out.push(' ');
            }
        }
        out.push_str(word);
        prev = Some(key);
    }

    out
}

/// Mean word confidence (0-100), if any words were recognized.
pub fn mean_confidence(tsv: &str) -> Option<f32> {
    let (sum, count) = parse_tokens(tsv)
        .filter(|t| !t.text.trim().is_empty() && t.confidence >= 0.0)
        .fold((0.0f32, 0usize), |(s, n), t| (s + t.confidence, n + 1));
    (count > 0).then(|| sum / count as f32)
}

/// Collects per-page OCR results in page order.
#[derive(Debug, Default)]
pub struct PageAccumulator {
    texts: Vec<String>,
    tsv: String,
    has_header: bool,
    pages: usize,
}

impl PageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one page. The table header is written once; data rows of later
    /// pages are appended with their page number rewritten to `page`.
    pub fn push(&mut self, page: usize, result: &PageOcr) {
        self.pages += 1;

        let text = result.text.trim();
        if !text.is_empty() {
            self.texts.push(text.to_string());
        }

        for line in result.tsv.lines() {
            if line.trim().is_empty() {
                continue;
            }
            if is_header(line) {
                if !self.has_header {
                    self.tsv.push_str(line);
                    self.tsv.push('\n');
                    self.has_header = true;
                }
                continue;
            }
            let page_str = page.to_string();
            let mut cols: Vec<&str> = line.splitn(COLUMNS, '\t').collect();
            if cols.len() > 1 {
                cols[1] = &page_str;
            }
            self.tsv.push_str(&cols.join("\t"));
            self.tsv.push('\n');
        }
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn finish(self) -> OcrOutput {
        OcrOutput {
            text: self.texts.join("\n\n"),
            tsv: self.tsv,
            pages: self.pages,
        }
    }
}
