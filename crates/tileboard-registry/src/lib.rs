//! Chart catalog, suggestion table and per-kind menus

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tileboard_ir::{ChartType, GridSize};

mod menus;
mod suggest;

pub use menus::*;
pub use suggest::*;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Chart type not found: {0}")]
    UnknownChartType(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    pub chart_type: ChartType,
    pub label: String,
    pub default_size: GridSize,
    /// Numeric fields a chart needs before it can draw (scatter matrix, heatmap, radar).
    pub min_numeric_fields: usize,
    pub needs_x_field: bool,
}

pub struct ChartRegistry {
    charts: HashMap<ChartType, ChartSpec>,
    version: String,
}

impl ChartRegistry {
    pub fn new(version: impl Into<String>) -> Self {
        let mut registry = Self {
            charts: HashMap::new(),
            version: version.into(),
        };
        registry.register_builtins();
        registry
    }

    fn register_builtins(&mut self) {
        for chart in ChartType::ALL {
            let min_numeric_fields = match chart {
                ChartType::ScatterMatrix | ChartType::Heatmap => 2,
                ChartType::Radar => 3,
                _ => 0,
            };
            // note, table, stat card, map and scatter matrix resolve their own fields
            let needs_x_field = !matches!(
                chart,
                ChartType::Note
                    | ChartType::Table
                    | ChartType::StatCard
                    | ChartType::Map
                    | ChartType::ScatterMatrix
            );
            self.register(ChartSpec {
                chart_type: chart,
                label: chart_label(chart).to_string(),
                default_size: chart.default_size(),
                min_numeric_fields,
                needs_x_field,
            });
        }
    }

    /// Register or replace the spec for a chart type.
    pub fn register(&mut self, spec: ChartSpec) {
        self.charts.insert(spec.chart_type, spec);
    }

    /// Resolve a snake_case chart name.
    pub fn lookup(&self, name: &str) -> Result<&ChartSpec, RegistryError> {
        name.parse::<ChartType>()
            .ok()
            .and_then(|chart| self.charts.get(&chart))
            .ok_or_else(|| RegistryError::UnknownChartType(name.to_string()))
    }

    pub fn spec(&self, chart: ChartType) -> Option<&ChartSpec> {
        self.charts.get(&chart)
    }

    /// Every registered chart in catalog order.
    pub fn charts(&self) -> Vec<&ChartSpec> {
        ChartType::ALL
            .iter()
            .filter_map(|chart| self.charts.get(chart))
            .collect()
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl Default for ChartRegistry {
    fn default() -> Self {
        Self::new("0.1.0")
    }
}

/// Display label shown in chart pickers.
pub fn chart_label(chart: ChartType) -> &'static str {
    match chart {
        ChartType::Table => "Table",
        ChartType::Line => "Line Chart",
        ChartType::Bar => "Bar Chart",
        ChartType::Area => "Area Chart",
        ChartType::Scatter => "Scatter Plot",
        ChartType::Pie => "Pie Chart",
        ChartType::Histogram => "Histogram",
        ChartType::Violin => "Violin Plot",
        ChartType::ScatterMatrix => "Scatter Matrix",
        ChartType::StatCard => "Stat Card (single value)",
        ChartType::Map => "Map (geographic)",
        ChartType::Note => "Note / Text",
        ChartType::GroupedBar => "Grouped Bar Chart",
        ChartType::StackedBar => "Stacked Bar Chart",
        ChartType::StackedArea => "Stacked Area Chart",
        ChartType::Heatmap => "Heatmap",
        ChartType::BoxPlot => "Box Plot",
        ChartType::Bubble => "Bubble Chart",
        ChartType::Radar => "Radar Chart",
        ChartType::Sunburst => "Sunburst Chart",
    }
}
