//! Legacy document normalization
//!
//! Stored visualizations exist in older shapes. [`normalize_document`] rewrites
//! any of them into the current shape before deserialization. It is pure,
//! total over JSON objects and idempotent; a current-shape document comes back
//! unchanged. Only the migrations below are applied, everything else passes
//! through as stored.
//!
//! 1. `config` envelope: `widgets`, `globalFilters` and `globalFilter` move to
//!    the top level (existing top-level keys win) and `config` is dropped.
//! 2. Widgets with no metrics but a legacy `yField` get one `sum` metric.
//! 3. A missing `globalFilters` is built from a legacy singular `globalFilter`
//!    carrying `table` and `dateField`, else it becomes empty.
//! 4. Widgets without a `layout` object get one from the flat `layoutX/Y/W/H`
//!    fields, the older `tileWidth`/`tileHeight` presets, or the chart default.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::{ChartType, DocumentError, GridSize, GRID_COLUMNS};

const LEGACY_FILTER_ID: &str = "legacy-filter";
const LEGACY_METRIC_COLOR: &str = "#2563eb";
const HOISTED_KEYS: [&str; 3] = ["widgets", "globalFilters", "globalFilter"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentVersion {
    /// At least one migration step would rewrite the document.
    Legacy,
    Current,
}

impl DocumentVersion {
    pub fn detect(document: &Value) -> Self {
        match document {
            Value::Object(map) => {
                let mut scratch = map.clone();
                if apply_steps(&mut scratch) {
                    DocumentVersion::Legacy
                } else {
                    DocumentVersion::Current
                }
            }
            _ => DocumentVersion::Current,
        }
    }
}

/// Rewrite a stored document into the current shape.
pub fn normalize_document(document: Value) -> Result<Value, DocumentError> {
    match document {
        Value::Object(mut map) => {
            apply_steps(&mut map);
            Ok(Value::Object(map))
        }
        _ => Err(DocumentError::NotAnObject),
    }
}

fn apply_steps(doc: &mut Map<String, Value>) -> bool {
    let mut changed = hoist_config(doc);
    changed |= synthesize_metrics(doc);
    changed |= synthesize_global_filters(doc);
    changed |= synthesize_layouts(doc);
    changed
}

fn hoist_config(doc: &mut Map<String, Value>) -> bool {
    let config = match doc.get("config") {
        Some(Value::Object(config)) => config.clone(),
        _ => return false,
    };
    for key in HOISTED_KEYS {
        if !doc.contains_key(key) {
            if let Some(v) = config.get(key) {
                doc.insert(key.to_string(), v.clone());
            }
        }
    }
    doc.remove("config");
    debug!(step = "config", "hoisted legacy config envelope");
    true
}

fn widgets_mut(doc: &mut Map<String, Value>) -> impl Iterator<Item = &mut Map<String, Value>> {
    doc.get_mut("widgets")
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object_mut)
}

fn non_empty_str<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn synthesize_metrics(doc: &mut Map<String, Value>) -> bool {
    let mut changed = false;
    for widget in widgets_mut(doc) {
        let has_metrics = matches!(widget.get("metrics"), Some(Value::Array(m)) if !m.is_empty());
        if has_metrics {
            continue;
        }
        if let Some(y_field) = non_empty_str(widget, "yField").map(str::to_string) {
            debug!(step = "metrics", y_field = %y_field, "synthesized metric from legacy yField");
            widget.insert(
                "metrics".to_string(),
                json!([{
                    "field": y_field,
                    "aggregate": "sum",
                    "color": LEGACY_METRIC_COLOR,
                    "legendLabel": "",
                }]),
            );
            changed = true;
        } else if !matches!(widget.get("metrics"), Some(Value::Array(_))) {
            widget.insert("metrics".to_string(), json!([]));
            changed = true;
        }
    }
    changed
}

fn synthesize_global_filters(doc: &mut Map<String, Value>) -> bool {
    if matches!(doc.get("globalFilters"), Some(v) if !v.is_null()) {
        return false;
    }
    let legacy = doc.get("globalFilter").and_then(Value::as_object).and_then(|f| {
        let table = non_empty_str(f, "table")?;
        let field = non_empty_str(f, "dateField")?;
        let mut filter = Map::new();
        filter.insert("id".to_string(), json!(LEGACY_FILTER_ID));
        filter.insert("table".to_string(), json!(table));
        filter.insert("field".to_string(), json!(field));
        filter.insert("operator".to_string(), json!("between"));
        for key in ["startDate", "endDate"] {
            if let Some(v) = f.get(key).and_then(Value::as_str) {
                filter.insert(key.to_string(), json!(v));
            }
        }
        Some(Value::Object(filter))
    });
    if legacy.is_some() {
        debug!(step = "global_filters", "synthesized global filter from legacy globalFilter");
    }
    doc.insert(
        "globalFilters".to_string(),
        Value::Array(legacy.into_iter().collect()),
    );
    true
}

fn synthesize_layouts(doc: &mut Map<String, Value>) -> bool {
    let mut changed = false;
    for widget in widgets_mut(doc) {
        if matches!(widget.get("layout"), Some(Value::Object(_))) {
            continue;
        }
        let layout = legacy_layout(widget);
        widget.insert("layout".to_string(), layout);
        changed = true;
    }
    changed
}

fn grid_units(v: Option<&Value>) -> Option<u32> {
    let n = v?.as_f64()?;
    (n.is_finite() && n >= 0.0).then(|| n.floor() as u32)
}

fn legacy_layout(widget: &Map<String, Value>) -> Value {
    let chart = widget
        .get("chartType")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<ChartType>().ok());
    let default = chart.map_or(GridSize::new(6, 4), |c| c.default_size());
    let is_stat = chart == Some(ChartType::StatCard);

    let w = grid_units(widget.get("layoutW"))
        .filter(|w| *w > 0)
        .or_else(|| if is_stat { Some(default.w) } else { None })
        .or_else(|| match widget.get("tileWidth").and_then(Value::as_u64) {
            Some(1) => Some(4),
            Some(3) => Some(12),
            _ => None,
        })
        .unwrap_or(default.w)
        .min(GRID_COLUMNS);
    let h = grid_units(widget.get("layoutH"))
        .filter(|h| *h > 0)
        .or_else(|| if is_stat { Some(default.h) } else { None })
        .or_else(|| match widget.get("tileHeight").and_then(Value::as_str) {
            Some("sm") => Some(3),
            Some("lg") => Some(6),
            _ => None,
        })
        .unwrap_or(default.h);

    json!({
        "x": grid_units(widget.get("layoutX")).unwrap_or(0).min(GRID_COLUMNS - w),
        "y": grid_units(widget.get("layoutY")).unwrap_or(0),
        "w": w,
        "h": h,
    })
}
