//! Chart types and grid geometry

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed column count of the dashboard grid.
pub const GRID_COLUMNS: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Table,
    Line,
    Bar,
    Area,
    Scatter,
    Pie,
    Histogram,
    Violin,
    ScatterMatrix,
    StatCard,
    Map,
    Note,
    GroupedBar,
    StackedBar,
    StackedArea,
    Heatmap,
    BoxPlot,
    Bubble,
    Radar,
    Sunburst,
}

impl ChartType {
    pub const ALL: [ChartType; 20] = [
        ChartType::Table,
        ChartType::Line,
        ChartType::Bar,
        ChartType::Area,
        ChartType::Scatter,
        ChartType::Pie,
        ChartType::Histogram,
        ChartType::Violin,
        ChartType::ScatterMatrix,
        ChartType::StatCard,
        ChartType::Map,
        ChartType::Note,
        ChartType::GroupedBar,
        ChartType::StackedBar,
        ChartType::StackedArea,
        ChartType::Heatmap,
        ChartType::BoxPlot,
        ChartType::Bubble,
        ChartType::Radar,
        ChartType::Sunburst,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Table => "table",
            ChartType::Line => "line",
            ChartType::Bar => "bar",
            ChartType::Area => "area",
            ChartType::Scatter => "scatter",
            ChartType::Pie => "pie",
            ChartType::Histogram => "histogram",
            ChartType::Violin => "violin",
            ChartType::ScatterMatrix => "scatter_matrix",
            ChartType::StatCard => "stat_card",
            ChartType::Map => "map",
            ChartType::Note => "note",
            ChartType::GroupedBar => "grouped_bar",
            ChartType::StackedBar => "stacked_bar",
            ChartType::StackedArea => "stacked_area",
            ChartType::Heatmap => "heatmap",
            ChartType::BoxPlot => "box_plot",
            ChartType::Bubble => "bubble",
            ChartType::Radar => "radar",
            ChartType::Sunburst => "sunburst",
        }
    }

    /// Initial width x height in grid units.
    pub fn default_size(&self) -> GridSize {
        match self {
            ChartType::StatCard => GridSize::new(3, 2),
            ChartType::Map => GridSize::new(12, 6),
            ChartType::ScatterMatrix => GridSize::new(8, 6),
            ChartType::Heatmap | ChartType::Radar => GridSize::new(6, 5),
            ChartType::Note => GridSize::new(4, 3),
            _ => GridSize::new(6, 4),
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChartType(pub String);

impl fmt::Display for UnknownChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown chart type: {}", self.0)
    }
}

impl std::error::Error for UnknownChartType {}

impl FromStr for ChartType {
    type Err = UnknownChartType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartType::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownChartType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub w: u32,
    pub h: u32,
}

impl GridSize {
    pub const fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }
}

/// Grid rectangle of a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Layout {
    pub fn at_origin(size: GridSize) -> Self {
        Self {
            x: 0,
            y: 0,
            w: size.w,
            h: size.h,
        }
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sizes() {
        assert_eq!(ChartType::StatCard.default_size(), GridSize::new(3, 2));
        assert_eq!(ChartType::Map.default_size(), GridSize::new(GRID_COLUMNS, 6));
        assert_eq!(ChartType::ScatterMatrix.default_size(), GridSize::new(8, 6));
        assert_eq!(ChartType::Heatmap.default_size(), GridSize::new(6, 5));
        assert_eq!(ChartType::Radar.default_size(), GridSize::new(6, 5));
        assert_eq!(ChartType::Note.default_size(), GridSize::new(4, 3));
        assert_eq!(ChartType::Bar.default_size(), GridSize::new(6, 4));
    }

    #[test]
    fn test_name_round_trip() {
        for chart in ChartType::ALL {
            assert_eq!(chart.as_str().parse::<ChartType>().unwrap(), chart);
            let json = serde_json::to_string(&chart).unwrap();
            assert_eq!(json, format!("\"{}\"", chart.as_str()));
        }
        assert!("pie_chart".parse::<ChartType>().is_err());
    }

    #[test]
    fn test_bottom_saturates() {
        let layout = Layout { x: 0, y: 3, w: 6, h: u32::MAX };
        assert_eq!(layout.bottom(), u32::MAX);
        assert_eq!(Layout::at_origin(GridSize::new(6, 4)).bottom(), 4);
    }
}
