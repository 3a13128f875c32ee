//! Tile drafts
//!
//! A [`TileDraft`] accumulates the builder's selection for one table and turns
//! it into a finished [`Widget`]. Which fields a widget carries depends on its
//! chart type; everything else is dropped at assembly time.

use std::collections::HashMap;
use thiserror::Error;
use tileboard_ir::{kind_of, AggregateMethod, ChartType, ColumnKind, ColumnSchema, Layout, Metric, TileFilter, Widget};
use tileboard_registry::{default_aggregate_for_kind, metric_aggregate_for_kind, suggest_for_columns};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("Select a table.")]
    MissingTable,
}

/// In-progress tile selection for one table.
#[derive(Debug, Clone)]
pub struct TileDraft {
    pub table: String,
    pub columns: Vec<ColumnSchema>,
    pub selected: Vec<String>,
    pub x_field: Option<String>,
    pub lat_field: Option<String>,
    pub lng_field: Option<String>,
    pub metrics: Vec<Metric>,
    pub chart_type: ChartType,
    pub title: String,
    pub note_content: String,
    pub group_by: Option<String>,
    pub category_field: Option<String>,
    /// Stat card aggregate chosen per selected variable.
    pub stat_aggregates: HashMap<String, AggregateMethod>,
    pub filters: Vec<TileFilter>,
}

fn is_latitude(lower: &str) -> bool {
    lower.contains("lat") && !lower.contains("lon") && !lower.contains("lng")
}

fn is_longitude(lower: &str) -> bool {
    lower.contains("lng") || lower.contains("lon") || (lower.contains("long") && lower.contains("itude"))
}

impl TileDraft {
    pub fn new(table: impl Into<String>, columns: Vec<ColumnSchema>) -> Self {
        Self {
            table: table.into(),
            columns,
            selected: Vec::new(),
            x_field: None,
            lat_field: None,
            lng_field: None,
            metrics: Vec::new(),
            chart_type: ChartType::Table,
            title: String::new(),
            note_content: String::new(),
            group_by: None,
            category_field: None,
            stat_aggregates: HashMap::new(),
            filters: Vec::new(),
        }
    }

    fn kind(&self, field: &str) -> Option<ColumnKind> {
        kind_of(&self.columns, field)
    }

    /// Select a variable. Coordinate-looking names also bind the map fields,
    /// and the first variable becomes the x field.
    pub fn add_variable(&mut self, name: &str) {
        if name.is_empty() || self.selected.iter().any(|v| v == name) {
            return;
        }
        self.selected.push(name.to_string());

        let lower = name.to_lowercase();
        if is_latitude(&lower) {
            self.lat_field = Some(name.to_string());
        } else if is_longitude(&lower) {
            self.lng_field = Some(name.to_string());
        }
        if self.x_field.is_none() {
            self.x_field = Some(name.to_string());
        }
    }

    pub fn remove_variable(&mut self, name: &str) {
        self.selected.retain(|v| v != name);
        self.metrics.retain(|m| m.field != name);
        for slot in [&mut self.x_field, &mut self.lat_field, &mut self.lng_field] {
            if slot.as_deref() == Some(name) {
                *slot = None;
            }
        }
    }

    /// Add a metric on `name` with the kind's default aggregate; one metric per field.
    pub fn add_metric_from_variable(&mut self, name: &str) {
        if name.is_empty() || self.metrics.iter().any(|m| m.field == name) {
            return;
        }
        let kind = self.kind(name).unwrap_or(ColumnKind::String);
        self.metrics.push(Metric::new(name, metric_aggregate_for_kind(kind)));
    }

    pub fn suggestions(&self) -> Vec<ChartType> {
        suggest_for_columns(&self.selected, &self.columns)
    }

    /// Fall back to the first suggestion when the chosen chart type is no longer offered.
    pub fn sync_chart_type(&mut self) -> ChartType {
        let suggested = self.suggestions();
        if !suggested.contains(&self.chart_type) {
            self.chart_type = suggested.first().copied().unwrap_or(ChartType::Table);
        }
        self.chart_type
    }

    fn selected_numeric(&self) -> Vec<String> {
        self.selected
            .iter()
            .filter(|v| self.kind(v) == Some(ColumnKind::Number))
            .cloned()
            .collect()
    }

    /// Grouped histogram or violin with a categorical group-by field.
    fn grouping(&self) -> Option<&str> {
        if !matches!(self.chart_type, ChartType::Histogram | ChartType::Violin) {
            return None;
        }
        self.group_by
            .as_deref()
            .filter(|g| !g.is_empty())
            .filter(|g| self.kind(g).is_some_and(|k| k.is_categorical()))
    }

    fn effective_metrics(&self, safe: &[Metric]) -> Vec<Metric> {
        if self.chart_type != ChartType::StatCard || !safe.is_empty() {
            return safe.to_vec();
        }
        self.selected
            .iter()
            .map(|v| {
                let aggregate = self.stat_aggregates.get(v).copied().unwrap_or_else(|| {
                    default_aggregate_for_kind(self.kind(v).unwrap_or(ColumnKind::String))
                });
                Metric::new(v.as_str(), aggregate)
            })
            .collect()
    }

    fn default_title(&self, metrics: &[Metric], grouping: Option<&str>) -> String {
        let table = self.table.as_str();
        match (self.chart_type, grouping) {
            (ChartType::StatCard, _) => {
                let joined = metrics
                    .iter()
                    .map(|m| format!("{}({})", m.aggregate.as_str(), m.field))
                    .collect::<Vec<_>>()
                    .join(", ");
                if joined.is_empty() {
                    "Stat".to_string()
                } else {
                    joined
                }
            }
            (_, Some(group)) => {
                let x = self.x_field.as_deref().filter(|x| !x.is_empty()).unwrap_or(table);
                format!("{x} by {group}")
            }
            (ChartType::Map, _) => format!("{table} Map"),
            (ChartType::ScatterMatrix, _) => format!("{table} Scatter Matrix"),
            (ChartType::Heatmap, _) => format!("{table} Heatmap"),
            (ChartType::Radar, _) => format!("{table} Radar"),
            (ChartType::Note, _) => "Note".to_string(),
            (chart, _) => format!("{table} {chart}"),
        }
    }

    /// Finalize the draft into a widget at the grid origin.
    pub fn assemble(&self) -> Result<Widget, AssemblyError> {
        if self.table.trim().is_empty() {
            return Err(AssemblyError::MissingTable);
        }
        let chart = self.chart_type;
        let safe: Vec<Metric> = self.metrics.iter().filter(|m| !m.field.is_empty()).cloned().collect();
        let metrics = self.effective_metrics(&safe);
        let grouping = self.grouping();
        let is_stat = chart == ChartType::StatCard;
        let x_field = self.x_field.clone().filter(|x| !x.is_empty());

        let title = match self.title.trim() {
            "" => self.default_title(&metrics, grouping),
            t => t.to_string(),
        };

        let mut widget = Widget::new(Uuid::new_v4().to_string(), title, self.table.clone(), chart);
        widget.x_field = x_field.clone();
        widget.group_field = grouping.map(str::to_string);
        if chart == ChartType::Map {
            widget.lat_field = self.lat_field.clone();
            widget.lng_field = self.lng_field.clone();
        }
        if matches!(chart, ChartType::ScatterMatrix | ChartType::Heatmap | ChartType::Radar) {
            widget.matrix_fields = Some(self.selected_numeric());
        }
        if chart == ChartType::Bubble && safe.len() >= 2 {
            widget.size_field = Some(safe[1].field.clone());
        }
        if matches!(chart, ChartType::Radar | ChartType::Sunburst) {
            widget.category_field = self.category_field.clone().filter(|c| !c.is_empty());
        }
        if chart == ChartType::Note {
            widget.note_content = Some(self.note_content.clone());
        }

        let active: Vec<TileFilter> = self.filters.iter().filter(|f| f.is_active()).cloned().collect();
        widget.filters = (!active.is_empty()).then_some(active);

        if !is_stat {
            widget.x_axis_label = x_field;
            widget.y_axis_label = Some(if grouping.is_some() {
                "count".to_string()
            } else {
                safe.first()
                    .map(|m| {
                        let label = m.legend_label.trim();
                        if label.is_empty() { m.field.clone() } else { label.to_string() }
                    })
                    .unwrap_or_else(|| "Value".to_string())
            });
        }
        widget.show_legend = !matches!(
            chart,
            ChartType::Map | ChartType::ScatterMatrix | ChartType::Note | ChartType::Heatmap
        );
        widget.color_by_category = grouping.is_some();
        widget.layout = Layout::at_origin(chart.default_size());
        widget.metrics = metrics;

        debug!(widget = %widget.id, table = %widget.table, chart = %chart, "assembled tile");
        Ok(widget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tileboard_ir::{GridSize, TileFilterOperator};

    fn columns() -> Vec<ColumnSchema> {
        vec![
            ColumnSchema::new("species", "text"),
            ColumnSchema::new("count", "integer"),
            ColumnSchema::new("depth", "double precision"),
            ColumnSchema::new("observed_on", "date"),
            ColumnSchema::new("latitude", "numeric"),
            ColumnSchema::new("longitude", "numeric"),
            ColumnSchema::new("tagged", "boolean"),
        ]
    }

    fn draft() -> TileDraft {
        TileDraft::new("sightings", columns())
    }

    #[test]
    fn test_add_variable_binds_fields() {
        let mut d = draft();
        d.add_variable("latitude");
        d.add_variable("longitude");
        d.add_variable("latitude");
        assert_eq!(d.selected, vec!["latitude", "longitude"]);
        assert_eq!(d.lat_field.as_deref(), Some("latitude"));
        assert_eq!(d.lng_field.as_deref(), Some("longitude"));
        assert_eq!(d.x_field.as_deref(), Some("latitude"));
        assert_eq!(d.sync_chart_type(), ChartType::Table);

        d.chart_type = ChartType::Bar;
        assert_eq!(d.sync_chart_type(), ChartType::Map);
    }

    #[test]
    fn test_remove_variable_clears_bindings() {
        let mut d = draft();
        d.add_variable("species");
        d.add_variable("count");
        d.add_metric_from_variable("species");
        d.add_metric_from_variable("count");
        d.add_metric_from_variable("count");
        assert_eq!(d.metrics.len(), 2);
        assert_eq!(d.metrics[0].aggregate, AggregateMethod::Count);
        assert_eq!(d.metrics[1].aggregate, AggregateMethod::Sum);

        d.remove_variable("species");
        assert_eq!(d.x_field, None);
        assert_eq!(d.selected, vec!["count"]);
        assert_eq!(d.metrics.len(), 1);
    }

    #[test]
    fn test_sync_chart_type() {
        let mut d = draft();
        d.chart_type = ChartType::Pie;
        d.add_variable("species");
        d.add_variable("count");
        assert_eq!(d.sync_chart_type(), ChartType::Pie);
        d.remove_variable("species");
        assert_eq!(d.sync_chart_type(), ChartType::StatCard);
    }

    #[test]
    fn test_missing_table() {
        let d = TileDraft::new("  ", columns());
        assert_eq!(d.assemble().unwrap_err(), AssemblyError::MissingTable);
    }

    #[test]
    fn test_bar_widget() {
        let mut d = draft();
        d.add_variable("species");
        d.add_variable("count");
        d.add_metric_from_variable("count");
        d.metrics.push(Metric::new("", AggregateMethod::Sum));
        d.chart_type = ChartType::Bar;
        d.filters.push(TileFilter::new("f1", "", TileFilterOperator::Eq));

        let w = d.assemble().unwrap();
        assert_eq!(w.title, "sightings bar");
        assert_eq!(w.metrics.len(), 1);
        assert_eq!(w.x_axis_label.as_deref(), Some("species"));
        assert_eq!(w.y_axis_label.as_deref(), Some("count"));
        assert!(w.filters.is_none());
        assert!(w.show_legend);
        assert!(!w.color_by_category);
        assert_eq!(w.layout, Layout::at_origin(GridSize::new(6, 4)));
        assert_eq!(Uuid::parse_str(&w.id).unwrap().get_version_num(), 4);
    }

    #[test]
    fn test_stat_card_metrics_from_selection() {
        let mut d = draft();
        d.add_variable("species");
        d.add_variable("count");
        d.stat_aggregates.insert("count".to_string(), AggregateMethod::Max);
        d.chart_type = ChartType::StatCard;

        let w = d.assemble().unwrap();
        assert_eq!(w.title, "distinct(species), max(count)");
        assert_eq!(w.metrics[0].aggregate, AggregateMethod::Distinct);
        assert_eq!(w.x_axis_label, None);
        assert_eq!(w.y_axis_label, None);

        let empty = TileDraft {
            chart_type: ChartType::StatCard,
            ..draft()
        };
        assert_eq!(empty.assemble().unwrap().title, "Stat");
    }

    #[test]
    fn test_grouping_needs_categorical_field() {
        let mut d = draft();
        d.add_variable("depth");
        d.chart_type = ChartType::Violin;
        d.group_by = Some("tagged".to_string());
        let w = d.assemble().unwrap();
        assert_eq!(w.group_field.as_deref(), Some("tagged"));
        assert_eq!(w.title, "depth by tagged");
        assert_eq!(w.y_axis_label.as_deref(), Some("count"));
        assert!(w.color_by_category);

        d.group_by = Some("count".to_string());
        let w = d.assemble().unwrap();
        assert_eq!(w.group_field, None);
        assert_eq!(w.title, "sightings violin");

        d.chart_type = ChartType::Bar;
        d.group_by = Some("species".to_string());
        assert_eq!(d.assemble().unwrap().group_field, None);
    }

    #[test]
    fn test_matrix_and_bubble_fields() {
        let mut d = draft();
        for v in ["species", "count", "depth", "latitude"] {
            d.add_variable(v);
        }
        d.chart_type = ChartType::Heatmap;
        let w = d.assemble().unwrap();
        assert_eq!(w.matrix_fields, Some(vec!["count".to_string(), "depth".to_string(), "latitude".to_string()]));
        assert_eq!(w.title, "sightings Heatmap");
        assert!(!w.show_legend);
        assert_eq!(w.layout.w, 6);
        assert_eq!(w.layout.h, 5);

        d.chart_type = ChartType::Bubble;
        d.add_metric_from_variable("depth");
        assert_eq!(d.assemble().unwrap().size_field, None);
        d.add_metric_from_variable("count");
        let w = d.assemble().unwrap();
        assert_eq!(w.size_field.as_deref(), Some("count"));
        assert_eq!(w.matrix_fields, None);
    }

    #[test]
    fn test_note_and_map() {
        let mut d = draft();
        d.chart_type = ChartType::Note;
        d.note_content = "Counts exclude juveniles".to_string();
        d.title = "  About  ".to_string();
        let w = d.assemble().unwrap();
        assert_eq!(w.title, "About");
        assert_eq!(w.note_content.as_deref(), Some("Counts exclude juveniles"));
        assert!(!w.show_legend);

        let mut d = draft();
        d.add_variable("latitude");
        d.add_variable("longitude");
        d.chart_type = ChartType::Map;
        let w = d.assemble().unwrap();
        assert_eq!(w.title, "sightings Map");
        assert_eq!(w.lng_field.as_deref(), Some("longitude"));
        assert_eq!(w.layout.w, 12);
    }
}
