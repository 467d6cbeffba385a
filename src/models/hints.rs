//! Structured metadata suggested by the model for a document.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::format_cents;

/// Kind of document, as classified by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Quote,
    Invoice,
    Receipt,
    Manual,
    Warranty,
    Permit,
    Inspection,
    Contract,
    Other,
}

impl DocumentType {
    pub const ALL: [Self; 9] = [
        Self::Quote,
        Self::Invoice,
        Self::Receipt,
        Self::Manual,
        Self::Warranty,
        Self::Permit,
        Self::Inspection,
        Self::Contract,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::Invoice => "invoice",
            Self::Receipt => "receipt",
            Self::Manual => "manual",
            Self::Warranty => "warranty",
            Self::Permit => "permit",
            Self::Inspection => "inspection",
            Self::Contract => "contract",
            Self::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// Kind of record a document most likely belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Project,
    Appliance,
    Vendor,
    Maintenance,
    Quote,
    ServiceLog,
}

impl EntityKind {
    pub const ALL: [Self; 6] = [
        Self::Project,
        Self::Appliance,
        Self::Vendor,
        Self::Maintenance,
        Self::Quote,
        Self::ServiceLog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Appliance => "appliance",
            Self::Vendor => "vendor",
            Self::Maintenance => "maintenance",
            Self::Quote => "quote",
            Self::ServiceLog => "service_log",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

/// A recurring maintenance task mentioned in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceItem {
    pub name: String,
    pub interval_months: u32,
}

/// Metadata hints extracted from a document. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    #[serde(default)]
    pub title_suggestion: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub vendor_hint: String,
    #[serde(default)]
    pub total_cents: Option<i64>,
    #[serde(default)]
    pub labor_cents: Option<i64>,
    #[serde(default)]
    pub materials_cents: Option<i64>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub warranty_expiry: Option<NaiveDate>,
    #[serde(default)]
    pub entity_kind_hint: Option<EntityKind>,
    #[serde(default)]
    pub entity_name_hint: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintenance_items: Vec<MaintenanceItem>,
    #[serde(default)]
    pub notes: String,
}

impl ExtractionHints {
    /// True when the model gave nothing usable.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Label / value pairs for the populated fields, in display order.
    pub fn display_lines(&self) -> Vec<(&'static str, String)> {
        let mut lines = Vec::new();
        if let Some(t) = self.document_type {
            lines.push(("type", t.as_str().to_string()));
        }
        let text_fields = [
            ("title", &self.title_suggestion),
            ("summary", &self.summary),
            ("vendor", &self.vendor_hint),
        ];
        for (label, value) in text_fields {
            if !value.trim().is_empty() {
                lines.push((label, value.trim().to_string()));
            }
        }
        let money = [
            ("total", self.total_cents),
            ("labor", self.labor_cents),
            ("materials", self.materials_cents),
        ];
        for (label, cents) in money {
            if let Some(c) = cents {
                lines.push((label, format_cents(c)));
            }
        }
        if let Some(d) = self.date {
            lines.push(("date", d.to_string()));
        }
        if let Some(d) = self.warranty_expiry {
            lines.push(("warranty", d.to_string()));
        }
        if let Some(kind) = self.entity_kind_hint {
            let name = self.entity_name_hint.trim();
            if name.is_empty() {
                lines.push(("entity", kind.as_str().to_string()));
            } else {
                lines.push(("entity", format!("{} {}", kind.as_str(), name)));
            }
        }
        for item in &self.maintenance_items {
            lines.push((
                "maintenance",
                format!("{} every {} mo", item.name, item.interval_months),
            ));
        }
        if !self.notes.trim().is_empty() {
            lines.push(("notes", self.notes.trim().to_string()));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_from_str() {
        assert_eq!(DocumentType::from_str(" Invoice "), Some(DocumentType::Invoice));
        assert_eq!(DocumentType::from_str("memo"), None);
        assert_eq!(EntityKind::from_str("service_log"), Some(EntityKind::ServiceLog));
        assert_eq!(EntityKind::from_str("house"), None);
    }

    #[test]
    fn test_display_lines() {
        let hints = ExtractionHints {
            document_type: Some(DocumentType::Invoice),
            vendor_hint: "Acme Plumbing".to_string(),
            total_cents: Some(150_000),
            entity_kind_hint: Some(EntityKind::Appliance),
            entity_name_hint: "Water heater".to_string(),
            ..Default::default()
        };
        let lines = hints.display_lines();
        assert_eq!(lines[0], ("type", "invoice".to_string()));
        assert!(lines.contains(&("total", "$1,500.00".to_string())));
        assert!(lines.contains(&("entity", "appliance Water heater".to_string())));
        assert!(!hints.is_empty());
        assert!(ExtractionHints::default().is_empty());
    }
}
