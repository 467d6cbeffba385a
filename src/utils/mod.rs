//! Shared utility functions.
//!
//! - `format`: Human-readable formatting (sizes, money, truncation)
//! - `mime`: MIME type classification and detection

mod format;
mod mime;

pub use format::{format_cents, format_size, truncate_chars};
pub use mime::{detect_mime, is_image, is_pdf, is_text, mime_icon, normalize_mime};
