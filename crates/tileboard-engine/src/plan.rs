//! Render plans handed to the chart renderer
//!
//! A plan is fully aggregated and filtered; the renderer only draws it.

use serde::Serialize;
use tileboard_ir::{ChartType, Row};

use crate::stats::{Bin, BoxStats};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderPlan {
    /// The widget is not ready to draw; `message` tells the user what is missing.
    Placeholder { message: String },
    Note { content: Option<String> },
    Table {
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
        #[serde(rename = "totalRows")]
        total_rows: usize,
    },
    StatCard { items: Vec<StatItem> },
    Map {
        points: Vec<MapPoint>,
        center: GeoPoint,
        #[serde(rename = "totalPoints")]
        total_points: usize,
    },
    ScatterMatrix { fields: Vec<String>, cells: Vec<MatrixCell> },
    Histogram { bins: Vec<Bin> },
    GroupedHistogram { groups: Vec<LegendEntry>, bins: Vec<GroupedBin> },
    Violin { points: Vec<ViolinPoint> },
    GroupedViolin { groups: Vec<LegendEntry>, points: Vec<GroupedViolinPoint> },
    Pie { slices: Vec<PieSlice>, legend: Vec<LegendEntry> },
    Scatter { series: SeriesInfo, points: Vec<Point> },
    Bubble {
        series: SeriesInfo,
        #[serde(rename = "sizeField")]
        size_field: String,
        points: Vec<BubblePoint>,
    },
    BoxPlot { stats: BoxStats },
    Heatmap { fields: Vec<String>, matrix: Vec<Vec<f64>> },
    Radar { variables: Vec<String>, series: Vec<RadarSeries> },
    Sunburst { nodes: Vec<SunburstNode> },
    Series(SeriesPlan),
}

impl RenderPlan {
    pub fn placeholder(message: impl Into<String>) -> Self {
        RenderPlan::Placeholder {
            message: message.into(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, RenderPlan::Placeholder { .. })
    }
}

/// Line, area and bar family charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPlan {
    pub chart_type: ChartType,
    pub series: Vec<SeriesInfo>,
    pub points: Vec<SeriesPoint>,
    pub categorical_x: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_legend: Option<Vec<LegendEntry>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesInfo {
    pub key: String,
    pub label: String,
    pub color: String,
}

/// One x category with one value per series, aligned with `SeriesPlan::series`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub x: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatItem {
    pub label: String,
    pub color: String,
    pub value: StatValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatValue {
    Number { value: f64, display: String },
    Chips { values: Vec<String>, remaining: usize },
    Text { text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub lat: f64,
    pub lng: f64,
    pub data: Row,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BubblePoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One panel of a scatter matrix; coordinates are normalized to `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixCell {
    pub x_field: String,
    pub y_field: String,
    pub points: Vec<Point>,
}

/// Counts per group, aligned with the plan's `groups`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedBin {
    pub label: String,
    pub counts: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViolinPoint {
    pub x: f64,
    pub up: f64,
    pub down: f64,
}

/// Mirrored widths per group around the group's baseline index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedViolinPoint {
    pub x: f64,
    pub up: Vec<f64>,
    pub down: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub name: String,
    pub value: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarSeries {
    pub name: String,
    pub color: String,
    /// Averages aligned with `variables`.
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SunburstNode {
    pub name: String,
    pub value: f64,
}
