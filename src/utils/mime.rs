//! MIME type classification and detection.

/// Strip parameters (`; charset=...`) and lowercase a MIME type.
pub fn normalize_mime(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or(mime)
        .trim()
        .to_lowercase()
}

pub fn is_pdf(mime: &str) -> bool {
    normalize_mime(mime) == "application/pdf"
}

pub fn is_image(mime: &str) -> bool {
    normalize_mime(mime).starts_with("image/")
}

pub fn is_text(mime: &str) -> bool {
    normalize_mime(mime).starts_with("text/")
}

/// Detect a MIME type from file content, falling back to the file extension.
///
/// Content sniffing wins because uploads are frequently misnamed; text files
/// have no magic bytes, so the extension decides for them.
pub fn detect_mime(data: &[u8], filename: &str) -> String {
    if let Some(kind) = infer::get(data) {
        return kind.mime_type().to_string();
    }
    mime_guess::from_path(filename)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Get an icon string for a MIME type.
pub fn mime_icon(mime: &str) -> &'static str {
    match normalize_mime(mime).as_str() {
        "application/pdf" => "[pdf]",
        m if m.starts_with("image/") => "[img]",
        "text/html" => "[htm]",
        m if m.starts_with("text/") => "[txt]",
        _ => "[---]",
    }
}
