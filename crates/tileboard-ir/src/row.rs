//! Untyped rows and the per-access value union
//!
//! Rows arrive from the table provider as open JSON objects with no schema
//! enforcement. Every consumer reads a field through [`Row::cell`] and coerces
//! on demand; nothing is converted up front.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::borrow::Cow;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Json>);

impl Row {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn from_map(map: Map<String, Json>) -> Self {
        Self(map)
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Json>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Json>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn cell(&self, field: &str) -> Cell<'_> {
        Cell::from_json(self.0.get(field))
    }

    /// Field names in source order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Json> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Json>> for Row {
    fn from(map: Map<String, Json>) -> Self {
        Self(map)
    }
}

/// One field of one row: number, text, boolean, or absent.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell<'a> {
    /// The row has no such field.
    Missing,
    Null,
    Bool(bool),
    Number(f64),
    Text(Cow<'a, str>),
}

impl<'a> Cell<'a> {
    pub fn from_json(value: Option<&'a Json>) -> Self {
        match value {
            None => Cell::Missing,
            Some(Json::Null) => Cell::Null,
            Some(Json::Bool(b)) => Cell::Bool(*b),
            Some(Json::Number(n)) => n.as_f64().map_or(Cell::Null, Cell::Number),
            Some(Json::String(s)) => Cell::Text(Cow::Borrowed(s.as_str())),
            // nested values are only ever compared as text
            Some(other) => Cell::Text(Cow::Owned(other.to_string())),
        }
    }

    /// Missing or null.
    pub fn is_absent(&self) -> bool {
        matches!(self, Cell::Missing | Cell::Null)
    }

    /// Missing, null, or the empty string.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Missing | Cell::Null => true,
            Cell::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Display form; `None` when absent.
    pub fn text(&self) -> Option<Cow<'a, str>> {
        match self {
            Cell::Missing | Cell::Null => None,
            Cell::Bool(b) => Some(Cow::Borrowed(if *b { "true" } else { "false" })),
            Cell::Number(n) => Some(Cow::Owned(format_number(*n))),
            Cell::Text(s) => Some(s.clone()),
        }
    }

    /// Finite numeric value, if the cell coerces to one.
    pub fn number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Cell::Text(s) => parse_number(s),
            _ => None,
        }
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::Text(s) => parse_timestamp(s),
            _ => None,
        }
    }
}

/// Parse a finite number from trimmed text. Empty text is not a number.
pub fn parse_number(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok().filter(|n| n.is_finite())
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp. Offsets are normalized to UTC; date-only text is midnight.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(t, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(t, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Shortest round-trip text for a number: `5.0` prints as `5`, `2.5` as `2.5`.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        "0".to_string()
    } else if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Row {
        Row::new()
            .with("count", 12)
            .with("ratio", 2.5)
            .with("label", "  42 ")
            .with("flag", true)
            .with("empty", "")
            .with("nothing", Json::Null)
            .with("observed_at", "2024-01-31T23:00:00")
    }

    #[test]
    fn test_cell_variants() {
        let row = sample();
        assert_eq!(row.cell("count"), Cell::Number(12.0));
        assert_eq!(row.cell("nothing"), Cell::Null);
        assert_eq!(row.cell("absent"), Cell::Missing);
        assert!(row.cell("absent").is_absent());
        assert!(row.cell("empty").is_blank());
        assert!(!row.cell("empty").is_absent());
    }

    #[test]
    fn test_number_coercion() {
        let row = sample();
        assert_eq!(row.cell("count").number(), Some(12.0));
        assert_eq!(row.cell("label").number(), Some(42.0));
        assert_eq!(row.cell("flag").number(), Some(1.0));
        assert_eq!(row.cell("empty").number(), None);
        assert_eq!(row.cell("nothing").number(), None);
        assert_eq!(Cell::Text("NaN".into()).number(), None);
        assert_eq!(Cell::Text("inf".into()).number(), None);
    }

    #[test]
    fn test_text_coercion() {
        let row = sample();
        assert_eq!(row.cell("count").text().as_deref(), Some("12"));
        assert_eq!(row.cell("ratio").text().as_deref(), Some("2.5"));
        assert_eq!(row.cell("flag").text().as_deref(), Some("true"));
        assert_eq!(row.cell("nothing").text(), None);
        let nested = Row::new().with("tags", json!(["a", "b"]));
        assert_eq!(nested.cell("tags").text().as_deref(), Some("[\"a\",\"b\"]"));
    }

    #[test]
    fn test_timestamp_formats() {
        let midnight = parse_timestamp("2024-01-31").unwrap();
        assert_eq!(midnight.to_string(), "2024-01-31 00:00:00");

        let local = parse_timestamp("2024-01-31T23:00:00").unwrap();
        assert_eq!(local.to_string(), "2024-01-31 23:00:00");

        let spaced = parse_timestamp("2024-01-31 08:15").unwrap();
        assert_eq!(spaced.to_string(), "2024-01-31 08:15:00");

        let offset = parse_timestamp("2024-02-01T01:00:00+02:00").unwrap();
        assert_eq!(offset.to_string(), "2024-01-31 23:00:00");

        assert!(parse_timestamp("abc").is_none());
        assert!(parse_timestamp("").is_none());
        assert!(Cell::Number(20240131.0).timestamp().is_none());
    }

    #[test]
    fn test_field_order_preserved() {
        let row: Row = serde_json::from_str(r#"{"zeta": 1, "alpha": 2, "mid": 3}"#).unwrap();
        assert_eq!(row.fields().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
    }
}
