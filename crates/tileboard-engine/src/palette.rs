//! Series and category colors

use tileboard_ir::{Metric, Widget};

pub const METRIC_PALETTE: [&str; 6] = ["#2563eb", "#16a34a", "#ea580c", "#7c3aed", "#dc2626", "#0891b2"];

pub const CATEGORY_PALETTE: [&str; 8] = [
    "#2563eb", "#16a34a", "#ea580c", "#7c3aed", "#dc2626", "#0891b2", "#ca8a04", "#0f766e",
];

pub fn metric_color(index: usize) -> &'static str {
    METRIC_PALETTE[index % METRIC_PALETTE.len()]
}

/// The metric's own color, else the palette color at its position.
pub fn series_color(metric: &Metric, index: usize) -> String {
    metric
        .color
        .as_deref()
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| metric_color(index))
        .to_string()
}

/// Widget override for the category, else the palette color at its position.
pub fn category_color(widget: &Widget, category: &str, index: usize) -> String {
    widget
        .category_override(category)
        .unwrap_or(CATEGORY_PALETTE[index % CATEGORY_PALETTE.len()])
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tileboard_ir::{AggregateMethod, ChartType};

    #[test]
    fn test_palette_wraps() {
        assert_eq!(metric_color(0), "#2563eb");
        assert_eq!(metric_color(6), "#2563eb");
        assert_eq!(metric_color(7), "#16a34a");
    }

    #[test]
    fn test_series_color_override() {
        let plain = Metric::new("count", AggregateMethod::Sum);
        assert_eq!(series_color(&plain, 2), "#ea580c");
        let custom = plain.clone().with_color("#000000");
        assert_eq!(series_color(&custom, 2), "#000000");
        let blank = plain.with_color("");
        assert_eq!(series_color(&blank, 1), "#16a34a");
    }

    #[test]
    fn test_category_color_override() {
        let mut w = Widget::new("w", "t", "sightings", ChartType::Pie);
        assert_eq!(category_color(&w, "heron", 7), "#0f766e");
        assert_eq!(category_color(&w, "heron", 8), "#2563eb");
        w.category_colors = Some([("heron".to_string(), "#111111".to_string())].into());
        assert_eq!(category_color(&w, "heron", 7), "#111111");
        assert_eq!(category_color(&w, "egret", 6), "#ca8a04");
    }
}
