//! Data models for docintake.

mod document;
mod hints;

pub use document::{Document, KnownEntities};
pub use hints::{DocumentType, EntityKind, ExtractionHints, MaintenanceItem};
