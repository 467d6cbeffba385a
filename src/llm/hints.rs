//! Parsing model replies into [`ExtractionHints`].
//!
//! Models are sloppy with types, so the reply is first read into a permissive
//! intermediate and then normalized field by field. Only a reply that is not
//! JSON at all is an error; anything else degrades to absent fields.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Deserialize;

use crate::models::{DocumentType, EntityKind, ExtractionHints, MaintenanceItem};

/// Reply could not be read as a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HintParseError {
    #[error("model reply is not valid JSON: {0}")]
    InvalidJson(String),
}

/// Dollar amount with exactly two decimals, e.g. "$1,234.56" or "89.00".
static DOLLAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$?\d+(?:,\d+)*\.\d{2}$").unwrap());

static BARE_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());

/// Date formats tried in order after ISO 8601.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y"];

/// A JSON value whose type the model may not have respected.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LooseValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl LooseValue {
    fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            Self::Number(n) => n.to_string(),
            Self::Other(_) => String::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawHints {
    #[serde(default)]
    document_type: Option<LooseValue>,
    #[serde(default)]
    title_suggestion: Option<LooseValue>,
    #[serde(default)]
    summary: Option<LooseValue>,
    #[serde(default)]
    vendor_hint: Option<LooseValue>,
    #[serde(default)]
    total: Option<LooseValue>,
    #[serde(default)]
    total_cents: Option<LooseValue>,
    #[serde(default)]
    labor: Option<LooseValue>,
    #[serde(default)]
    labor_cents: Option<LooseValue>,
    #[serde(default)]
    materials: Option<LooseValue>,
    #[serde(default)]
    materials_cents: Option<LooseValue>,
    #[serde(default)]
    currency_unit: Option<LooseValue>,
    #[serde(default)]
    date: Option<LooseValue>,
    #[serde(default)]
    warranty_expiry: Option<LooseValue>,
    #[serde(default)]
    entity_kind_hint: Option<LooseValue>,
    #[serde(default)]
    entity_name_hint: Option<LooseValue>,
    #[serde(default)]
    maintenance_items: Option<LooseValue>,
    #[serde(default)]
    notes: Option<LooseValue>,
}

#[derive(Debug, Deserialize)]
struct RawMaintenanceItem {
    #[serde(default)]
    name: Option<LooseValue>,
    #[serde(default)]
    interval_months: Option<LooseValue>,
}

/// Parse a raw model reply.
pub fn parse_response(raw: &str) -> Result<ExtractionHints, HintParseError> {
    let body = strip_fences(raw);
    let raw: RawHints =
        serde_json::from_str(body).map_err(|e| HintParseError::InvalidJson(e.to_string()))?;

    let in_dollars = raw
        .currency_unit
        .as_ref()
        .map(|u| u.as_text().eq_ignore_ascii_case("dollars"))
        .unwrap_or(false);

    Ok(ExtractionHints {
        document_type: text(&raw.document_type)
            .as_deref()
            .and_then(DocumentType::from_str),
        title_suggestion: text(&raw.title_suggestion).unwrap_or_default(),
        summary: text(&raw.summary).unwrap_or_default(),
        vendor_hint: text(&raw.vendor_hint).unwrap_or_default(),
        total_cents: money_field(&raw.total, &raw.total_cents, in_dollars),
        labor_cents: money_field(&raw.labor, &raw.labor_cents, in_dollars),
        materials_cents: money_field(&raw.materials, &raw.materials_cents, in_dollars),
        date: text(&raw.date).as_deref().and_then(parse_date),
        warranty_expiry: text(&raw.warranty_expiry).as_deref().and_then(parse_date),
        entity_kind_hint: text(&raw.entity_kind_hint)
            .as_deref()
            .and_then(EntityKind::from_str),
        entity_name_hint: text(&raw.entity_name_hint).unwrap_or_default(),
        maintenance_items: maintenance_items(raw.maintenance_items),
        notes: text(&raw.notes).unwrap_or_default(),
    })
}

/// Drop a leading and a trailing markdown fence line, if present.
fn strip_fences(raw: &str) -> &str {
    let mut body = raw.trim();
    if body.starts_with("```") {
        body = match body.find('\n') {
            Some(pos) => &body[pos + 1..],
            None => "",
        };
    }
    let trimmed = body.trim_end();
    if let Some(pos) = trimmed.rfind('\n') {
        if trimmed[pos + 1..].trim_start().starts_with("```") {
            body = &trimmed[..pos];
        }
    } else if trimmed.starts_with("```") {
        body = "";
    }
    body.trim()
}

fn text(value: &Option<LooseValue>) -> Option<String> {
    value.as_ref().map(LooseValue::as_text)
}

/// A money field the model may name with or without the `_cents` suffix.
/// The unsuffixed key wins when both hold a usable amount.
fn money_field(
    plain: &Option<LooseValue>,
    suffixed: &Option<LooseValue>,
    in_dollars: bool,
) -> Option<i64> {
    money_to_cents(plain.as_ref(), in_dollars)
        .or_else(|| money_to_cents(suffixed.as_ref(), in_dollars))
}

/// Normalize a money field to cents. Zero means "not stated".
///
/// Numbers follow the declared unit. Strings shaped like a dollar amount
/// (two decimals) are always dollars; bare digit strings are cents.
pub fn money_to_cents(value: Option<&LooseValue>, in_dollars: bool) -> Option<i64> {
    let cents = match value? {
        LooseValue::Number(n) if n.is_finite() => {
            if in_dollars {
                (n * 100.0).round() as i64
            } else {
                n.round() as i64
            }
        }
        LooseValue::Number(_) => return None,
        LooseValue::Text(s) => {
            let s = s.trim();
            if DOLLAR_PATTERN.is_match(s) {
                let digits: String = s.chars().filter(|c| *c != '$' && *c != ',').collect();
                let dollars: f64 = digits.parse().ok()?;
                (dollars * 100.0).round() as i64
            } else if BARE_DIGITS.is_match(s) {
                s.parse().ok()?
            } else {
                return None;
            }
        }
        LooseValue::Other(_) => return None,
    };
    (cents != 0).then_some(cents)
}

/// Parse the date spellings models commonly produce. First match wins.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, DATE_FORMATS[0]) {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DATE_FORMATS[1..]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn maintenance_items(value: Option<LooseValue>) -> Vec<MaintenanceItem> {
    let Some(LooseValue::Other(serde_json::Value::Array(items))) = value else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RawMaintenanceItem>(item).ok())
        .filter_map(|item| {
            let name = text(&item.name)?;
            let interval = item.interval_months.as_ref().and_then(interval_months)?;
            (!name.is_empty()).then_some(MaintenanceItem {
                name,
                interval_months: interval,
            })
        })
        .collect()
}

fn interval_months(value: &LooseValue) -> Option<u32> {
    let months = match value {
        LooseValue::Number(n) if n.fract() == 0.0 && *n >= 1.0 && *n <= u32::MAX as f64 => {
            *n as u32
        }
        LooseValue::Text(s) => s.trim().parse::<u32>().ok()?,
        _ => return None,
    };
    (months > 0).then_some(months)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> LooseValue {
        LooseValue::Number(n)
    }

    fn txt(s: &str) -> LooseValue {
        LooseValue::Text(s.to_string())
    }

    #[test]
    fn test_money_rules() {
        assert_eq!(money_to_cents(Some(&num(1500.0)), true), Some(150_000));
        assert_eq!(money_to_cents(Some(&num(19.99)), true), Some(1999));
        assert_eq!(money_to_cents(Some(&num(1500.0)), false), Some(1500));
        assert_eq!(money_to_cents(Some(&txt("$1,234.56")), false), Some(123_456));
        assert_eq!(money_to_cents(Some(&txt("89.00")), false), Some(8900));
        assert_eq!(money_to_cents(Some(&txt("4500")), true), Some(4500));
        assert_eq!(money_to_cents(Some(&txt("about $40")), false), None);
        assert_eq!(money_to_cents(Some(&txt("1,234")), false), None);
        assert_eq!(money_to_cents(Some(&num(0.0)), true), None);
        assert_eq!(money_to_cents(Some(&txt("0")), false), None);
        assert_eq!(money_to_cents(Some(&txt("$0.00")), false), None);
        assert_eq!(money_to_cents(None, true), None);
        assert_eq!(
            money_to_cents(Some(&LooseValue::Other(serde_json::json!(true))), false),
            None
        );
    }

    #[test]
    fn test_date_formats() {
        let jan15 = NaiveDate::from_ymd_opt(2025, 1, 15);
        assert_eq!(parse_date("2025-01-15"), jan15);
        assert_eq!(parse_date("2025-01-15T10:30:00Z"), jan15);
        assert_eq!(parse_date("2025-01-15T10:30:00"), jan15);
        assert_eq!(parse_date("01/15/2025"), jan15);
        assert_eq!(parse_date("1/15/2025"), jan15);
        assert_eq!(parse_date("January 15, 2025"), jan15);
        assert_eq!(parse_date("Jan 15, 2025"), jan15);
        assert_eq!(parse_date("3/5/2024"), NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(parse_date("15 janvier"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("2025-02-30"), None);
    }

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_fences("```\n{}\n```\n"), "{}");
        assert_eq!(strip_fences("  {}  "), "{}");
        assert_eq!(strip_fences("{\n}"), "{\n}");
    }

    #[test]
    fn test_full_reply() {
        let raw = r#"```json
{
  "document_type": "Invoice",
  "title_suggestion": "Acme water heater invoice",
  "vendor_hint": "Acme Plumbing",
  "total": 1500,
  "labor": "$400.00",
  "materials": 0,
  "currency_unit": "dollars",
  "date": "January 15, 2025",
  "warranty_expiry": "2031-01-15",
  "entity_kind_hint": "appliance",
  "entity_name_hint": "Water heater",
  "maintenance_items": [
    {"name": "Flush tank", "interval_months": 12},
    {"name": "  ", "interval_months": 6},
    {"name": "Check anode", "interval_months": 0},
    {"name": "Test valve", "interval_months": "24"},
    "garbage"
  ],
  "notes": null
}
```"#;
        let hints = parse_response(raw).unwrap();
        assert_eq!(hints.document_type, Some(DocumentType::Invoice));
        assert_eq!(hints.vendor_hint, "Acme Plumbing");
        assert_eq!(hints.total_cents, Some(150_000));
        assert_eq!(hints.labor_cents, Some(40_000));
        assert_eq!(hints.materials_cents, None);
        assert_eq!(hints.date, NaiveDate::from_ymd_opt(2025, 1, 15));
        assert_eq!(hints.warranty_expiry, NaiveDate::from_ymd_opt(2031, 1, 15));
        assert_eq!(hints.entity_kind_hint, Some(EntityKind::Appliance));
        assert_eq!(
            hints.maintenance_items,
            vec![
                MaintenanceItem {
                    name: "Flush tank".to_string(),
                    interval_months: 12
                },
                MaintenanceItem {
                    name: "Test valve".to_string(),
                    interval_months: 24
                },
            ]
        );
        assert_eq!(hints.notes, "");
    }

    #[test]
    fn test_invalid_enums_dropped() {
        let hints = parse_response(
            r#"{"document_type": "memo", "entity_kind_hint": "house", "vendor_hint": "Bob"}"#,
        )
        .unwrap();
        assert_eq!(hints.document_type, None);
        assert_eq!(hints.entity_kind_hint, None);
        assert_eq!(hints.vendor_hint, "Bob");
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(matches!(
            parse_response("Sure! Here is the JSON you asked for."),
            Err(HintParseError::InvalidJson(_))
        ));
        assert!(parse_response("").is_err());
    }

    #[test]
    fn test_both_money_spellings() {
        let hints =
            parse_response(r#"{"total":1500,"total_cents":150000,"vendor_hint":"Acme"}"#).unwrap();
        assert_eq!(hints.total_cents, Some(1500));
        assert_eq!(hints.vendor_hint, "Acme");

        let hints = parse_response(r#"{"labor":"n/a","labor_cents":4200}"#).unwrap();
        assert_eq!(hints.labor_cents, Some(4200));
    }

    #[test]
    fn test_empty_object() {
        assert!(parse_response("{}").unwrap().is_empty());
    }
}
