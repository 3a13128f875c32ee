//! Tileboard document model
//!
//! Persisted dashboard ("visualization") and tile ("widget") documents, plus the
//! row and column vocabulary they are evaluated against. Documents serialize as
//! camelCase JSON; the fingerprint is deterministic for caching.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

mod chart;
mod migrate;
mod row;
mod types;

pub use chart::*;
pub use migrate::{normalize_document, DocumentVersion};
pub use row::*;
pub use types::*;

/// Metric field that aggregates a constant 1 per row.
pub const COUNT_SENTINEL: &str = "__count__";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Invalid document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document must be a JSON object")]
    NotAnObject,

    #[error("Duplicate widget id: {0}")]
    DuplicateWidgetId(String),
}

/// Persisted dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visualization {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_id: Option<String>,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub widgets: Vec<Widget>,

    #[serde(default)]
    pub global_filters: Vec<GlobalFilter>,

    #[serde(default)]
    pub created_at: String,
}

impl Visualization {
    /// Normalize a stored document of any known shape and deserialize it.
    pub fn from_document(document: serde_json::Value) -> Result<Self, DocumentError> {
        let normalized = normalize_document(document)?;
        let vis: Visualization = serde_json::from_value(normalized)?;
        vis.validate()?;
        Ok(vis)
    }

    pub fn to_document(&self) -> Result<serde_json::Value, DocumentError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Widget ids must be unique within one dashboard.
    pub fn validate(&self) -> Result<(), DocumentError> {
        let mut seen = HashSet::new();
        for w in &self.widgets {
            if !seen.insert(w.id.as_str()) {
                return Err(DocumentError::DuplicateWidgetId(w.id.clone()));
            }
        }
        Ok(())
    }

    /// SHA-256 over the canonical JSON form.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("visualization should always serialize");
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn widget(&self, id: &str) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.id == id)
    }

    /// Distinct tables read by the widgets, in widget order.
    pub fn tables(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for w in &self.widgets {
            if !out.contains(&w.table.as_str()) {
                out.push(&w.table);
            }
        }
        out
    }
}

/// One tile on a dashboard, bound to one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    pub id: String,
    pub title: String,
    pub table: String,
    pub chart_type: ChartType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix_fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_content: Option<String>,

    #[serde(default)]
    pub metrics: Vec<Metric>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<TileFilter>>,

    pub layout: Layout,

    #[serde(default = "default_true")]
    pub show_legend: bool,
    #[serde(default)]
    pub color_by_category: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_colors: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_axis_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis_label: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Widget {
    /// A bare widget at the grid origin with the chart type's default size.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        table: impl Into<String>,
        chart_type: ChartType,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            table: table.into(),
            chart_type,
            x_field: None,
            group_field: None,
            lat_field: None,
            lng_field: None,
            matrix_fields: None,
            size_field: None,
            category_field: None,
            note_content: None,
            metrics: Vec::new(),
            filters: None,
            layout: Layout::at_origin(chart_type.default_size()),
            show_legend: true,
            color_by_category: false,
            category_colors: None,
            x_axis_label: None,
            y_axis_label: None,
        }
    }

    /// Tile filters that take part in evaluation.
    pub fn active_filters(&self) -> impl Iterator<Item = &TileFilter> {
        self.filters.iter().flatten().filter(|f| f.is_active())
    }

    pub fn category_override(&self, category: &str) -> Option<&str> {
        self.category_colors
            .as_ref()
            .and_then(|m| m.get(category))
            .map(String::as_str)
            .filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateMethod {
    Raw,
    Count,
    Sum,
    Mean,
    Avg,
    Min,
    Max,
    Median,
    Mode,
    Distinct,
}

impl AggregateMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateMethod::Raw => "raw",
            AggregateMethod::Count => "count",
            AggregateMethod::Sum => "sum",
            AggregateMethod::Mean => "mean",
            AggregateMethod::Avg => "avg",
            AggregateMethod::Min => "min",
            AggregateMethod::Max => "max",
            AggregateMethod::Median => "median",
            AggregateMethod::Mode => "mode",
            AggregateMethod::Distinct => "distinct",
        }
    }

    /// `avg` is an alias of `mean`.
    pub fn normalized(self) -> Self {
        match self {
            AggregateMethod::Avg => AggregateMethod::Mean,
            m => m,
        }
    }
}

/// A (field, aggregate, display) triple contributing one series to a tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub field: String,
    pub aggregate: AggregateMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub legend_label: String,
}

impl Metric {
    pub fn new(field: impl Into<String>, aggregate: AggregateMethod) -> Self {
        Self {
            field: field.into(),
            aggregate,
            color: None,
            legend_label: String::new(),
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.legend_label = label.into();
        self
    }

    /// The implicit row-count series used when a chart has no metric.
    pub fn count_sentinel() -> Self {
        Self::new(COUNT_SENTINEL, AggregateMethod::Count).with_label("Count")
    }

    pub fn is_count_sentinel(&self) -> bool {
        self.field == COUNT_SENTINEL
    }

    /// Legend text: the trimmed legend label, else `aggregate(field)`.
    pub fn label(&self) -> String {
        let trimmed = self.legend_label.trim();
        if trimmed.is_empty() {
            format!("{}({})", self.aggregate.as_str(), self.field)
        } else {
            trimmed.to_string()
        }
    }

    /// Series key used in render plans.
    pub fn key(&self) -> String {
        format!("{}:{}", self.aggregate.as_str(), self.field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileFilterOperator {
    Eq,
    Neq,
    Contains,
    NotContains,
    In,
    NotIn,
    Gt,
    Lt,
    Gte,
    Lte,
    Between,
    Before,
    After,
    DateBetween,
}

/// Filter attached to a single tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileFilter {
    pub id: String,
    #[serde(default)]
    pub field: String,
    pub operator: TileFilterOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,
}

impl TileFilter {
    pub fn new(id: impl Into<String>, field: impl Into<String>, operator: TileFilterOperator) -> Self {
        Self {
            id: id.into(),
            field: field.into(),
            operator,
            value: None,
            values: None,
            min: None,
            max: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_range(mut self, min: Option<&str>, max: Option<&str>) -> Self {
        self.min = min.map(str::to_string);
        self.max = max.map(str::to_string);
        self
    }

    /// Filters with an empty field are inert.
    pub fn is_active(&self) -> bool {
        !self.field.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalFilterOperator {
    Eq,
    Contains,
    Gte,
    Lte,
    Between,
}

/// Dashboard-wide filter scoped to one table and field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalFilter {
    pub id: String,
    #[serde(default)]
    pub table: String,
    #[serde(default)]
    pub field: String,
    pub operator: GlobalFilterOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_value: Option<String>,
}

impl GlobalFilter {
    pub fn new(
        id: impl Into<String>,
        table: impl Into<String>,
        field: impl Into<String>,
        operator: GlobalFilterOperator,
    ) -> Self {
        Self {
            id: id.into(),
            table: table.into(),
            field: field.into(),
            operator,
            value: None,
            start_date: None,
            end_date: None,
            start_value: None,
            end_value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_dates(mut self, start: Option<&str>, end: Option<&str>) -> Self {
        self.start_date = start.map(str::to_string);
        self.end_date = end.map(str::to_string);
        self
    }

    pub fn with_values(mut self, start: Option<&str>, end: Option<&str>) -> Self {
        self.start_value = start.map(str::to_string);
        self.end_value = end.map(str::to_string);
        self
    }

    /// Active for `table` when scoped to it and bound to a field.
    pub fn applies_to(&self, table: &str) -> bool {
        self.table == table && !self.field.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dashboard() -> Visualization {
        let mut bar = Widget::new("w-1", "sightings bar", "sightings", ChartType::Bar);
        bar.x_field = Some("species".to_string());
        bar.metrics.push(Metric::new("count", AggregateMethod::Sum));
        let mut colors = BTreeMap::new();
        colors.insert("heron".to_string(), "#0f766e".to_string());
        colors.insert("egret".to_string(), "#ca8a04".to_string());
        bar.category_colors = Some(colors);

        Visualization {
            id: "vis-1".to_string(),
            program_id: Some("prog-7".to_string()),
            name: "Wetlands".to_string(),
            description: None,
            widgets: vec![bar, Widget::new("w-2", "Note", "sightings", ChartType::Note)],
            global_filters: vec![GlobalFilter::new(
                "g-1",
                "sightings",
                "observed_on",
                GlobalFilterOperator::Between,
            )
            .with_dates(Some("2024-01-01"), Some("2024-01-31"))],
            created_at: "2024-02-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let a = dashboard();
        let b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());

        let mut c = a.clone();
        c.widgets[0].title = "renamed".to_string();
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_document_round_trip() {
        let vis = dashboard();
        let doc = vis.to_document().unwrap();
        assert_eq!(doc["widgets"][0]["chartType"], "bar");
        assert_eq!(doc["globalFilters"][0]["startDate"], "2024-01-01");
        let parsed = Visualization::from_document(doc).unwrap();
        assert_eq!(parsed.fingerprint(), vis.fingerprint());
    }

    #[test]
    fn test_duplicate_widget_ids_rejected() {
        let mut vis = dashboard();
        vis.widgets[1].id = "w-1".to_string();
        let err = Visualization::from_document(vis.to_document().unwrap()).unwrap_err();
        assert!(matches!(err, DocumentError::DuplicateWidgetId(id) if id == "w-1"));
    }

    #[test]
    fn test_show_legend_defaults_true() {
        let vis = Visualization::from_document(json!({
            "id": "v",
            "name": "n",
            "widgets": [{
                "id": "w", "title": "t", "table": "t", "chartType": "pie",
                "layout": {"x": 0, "y": 0, "w": 6, "h": 4}
            }],
            "globalFilters": []
        }))
        .unwrap();
        assert!(vis.widgets[0].show_legend);
        assert!(!vis.widgets[0].color_by_category);
        assert!(vis.widgets[0].metrics.is_empty());
    }

    #[test]
    fn test_metric_label_and_key() {
        let m = Metric::new("price", AggregateMethod::Avg);
        assert_eq!(m.label(), "avg(price)");
        assert_eq!(m.key(), "avg:price");
        assert_eq!(m.clone().with_label("  Price  ").label(), "Price");
        assert_eq!(AggregateMethod::Avg.normalized(), AggregateMethod::Mean);
        assert!(Metric::count_sentinel().is_count_sentinel());
    }

    #[test]
    fn test_inert_filters() {
        let tile = TileFilter::new("f", "", TileFilterOperator::Eq);
        assert!(!tile.is_active());
        let global = GlobalFilter::new("g", "sightings", "", GlobalFilterOperator::Eq);
        assert!(!global.applies_to("sightings"));
        let scoped = GlobalFilter::new("g", "sightings", "site", GlobalFilterOperator::Eq);
        assert!(scoped.applies_to("sightings"));
        assert!(!scoped.applies_to("visits"));
    }

    #[test]
    fn test_tables_in_widget_order() {
        let mut vis = dashboard();
        vis.widgets.push(Widget::new("w-3", "v", "visits", ChartType::Table));
        assert_eq!(vis.tables(), vec!["sightings", "visits"]);
    }
}
