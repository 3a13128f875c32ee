//! Widget rendering
//!
//! [`render_widget`] applies the widget's tile filters and resolves one
//! [`RenderPlan`]. Missing configuration never errors; it yields a placeholder
//! telling the user what to select next.

use std::collections::HashMap;
use tileboard_ir::{parse_number, AggregateMethod, Cell, ChartType, Metric, Row, Widget};
use tracing::debug;

use crate::aggregate::{aggregate, aggregate_cells, aggregate_general, distinct_values};
use crate::filter::TileFilterEvaluator;
use crate::palette::{category_color, metric_color, series_color};
use crate::plan::*;
use crate::stats::{histogram, min_max, normalize, pearson, Binning, BoxStats};

pub const TABLE_PREVIEW_ROWS: usize = 30;
pub const MAP_POINT_LIMIT: usize = 1000;
pub const MATRIX_FIELD_LIMIT: usize = 4;
pub const MATRIX_ROW_LIMIT: usize = 250;
pub const BAR_CATEGORY_LIMIT: usize = 40;
pub const HISTOGRAM_BINS: usize = 12;
pub const GROUP_LIMIT: usize = 12;
const VIOLIN_BINS: usize = 14;
const GROUPED_VIOLIN_BINS: usize = 18;
const VIOLIN_WIDTH: f64 = 0.35;
const BUBBLE_MIN: f64 = 50.0;
const BUBBLE_MAX: f64 = 400.0;

pub fn render_widget<'r, I>(widget: &Widget, rows: I) -> RenderPlan
where
    I: IntoIterator<Item = &'r Row>,
{
    let rows = TileFilterEvaluator::for_widget(widget).filter(rows);

    let plan = match widget.chart_type {
        ChartType::Note => RenderPlan::Note {
            content: widget.note_content.clone(),
        },
        ChartType::Table => table_plan(&rows),
        ChartType::ScatterMatrix => scatter_matrix_plan(widget, &rows),
        ChartType::Map => map_plan(widget, &rows),
        ChartType::StatCard => stat_card_plan(widget, &rows),
        _ => match non_empty(&widget.x_field) {
            Some(x) => field_plan(widget, x, &rows),
            None => RenderPlan::placeholder("Select an X field."),
        },
    };

    match &plan {
        RenderPlan::Placeholder { message } => {
            debug!(widget = %widget.id, chart = %widget.chart_type, reason = %message, "widget not ready")
        }
        _ => debug!(widget = %widget.id, chart = %widget.chart_type, rows = rows.len(), "rendered widget"),
    }
    plan
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|f| !f.is_empty())
}

fn numbers(rows: &[&Row], field: &str) -> Vec<f64> {
    rows.iter().filter_map(|r| r.cell(field).number()).collect()
}

fn display(cell: Cell<'_>) -> String {
    cell.text().map(|t| t.into_owned()).unwrap_or_default()
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Metrics with a field, in order.
fn configured_metrics(widget: &Widget) -> Vec<&Metric> {
    widget.metrics.iter().filter(|m| !m.field.is_empty()).collect()
}

/// Configured metrics, or the row-count series when there are none.
fn series_metrics(widget: &Widget) -> Vec<Metric> {
    let metrics: Vec<Metric> = configured_metrics(widget).into_iter().cloned().collect();
    if metrics.is_empty() {
        vec![Metric::count_sentinel()]
    } else {
        metrics
    }
}

fn series_info(metric: &Metric, index: usize) -> SeriesInfo {
    SeriesInfo {
        key: metric.key(),
        label: metric.label(),
        color: series_color(metric, index),
    }
}

fn series_value(metric: &Metric, rows: &[&Row]) -> f64 {
    if metric.is_count_sentinel() {
        return aggregate(&vec![1.0; rows.len()], metric.aggregate);
    }
    let cells: Vec<Cell<'_>> = rows.iter().map(|r| r.cell(&metric.field)).collect();
    aggregate_cells(&cells, metric.aggregate)
}

/// Partition rows by the display value of `field`, in first-seen order.
fn group_by<'r>(rows: &[&'r Row], field: &str) -> Vec<(String, Vec<&'r Row>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<&'r Row>)> = Vec::new();
    for row in rows {
        let key = display(row.cell(field));
        match index.get(&key) {
            Some(&i) => groups[i].1.push(*row),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![*row]));
            }
        }
    }
    groups
}

fn table_plan(rows: &[&Row]) -> RenderPlan {
    let columns: Vec<String> = rows
        .first()
        .map(|r| r.fields().map(str::to_string).collect())
        .unwrap_or_default();
    let preview = rows
        .iter()
        .take(TABLE_PREVIEW_ROWS)
        .map(|r| columns.iter().map(|c| display(r.cell(c))).collect())
        .collect();
    RenderPlan::Table {
        columns,
        rows: preview,
        total_rows: rows.len(),
    }
}

/// Stat display: thousands separators and at most two decimals.
pub fn format_stat(n: f64) -> String {
    let text = if n.fract() == 0.0 {
        format!("{n:.0}")
    } else {
        let fixed = format!("{n:.2}");
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    };
    let (sign, body) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (int, frac) = match body.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (body, None),
    };

    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    match frac {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

fn stat_card_plan(widget: &Widget, rows: &[&Row]) -> RenderPlan {
    let metrics: Vec<Metric> = if !widget.metrics.is_empty() {
        widget.metrics.clone()
    } else if let Some(x) = non_empty(&widget.x_field) {
        vec![Metric::new(x, AggregateMethod::Count)]
    } else {
        return RenderPlan::placeholder("Select at least one variable.");
    };

    let items = metrics
        .iter()
        .enumerate()
        .map(|(idx, m)| {
            let cells: Vec<Cell<'_>> = rows.iter().map(|r| r.cell(&m.field)).collect();
            let value = if m.aggregate == AggregateMethod::Distinct {
                let listing = distinct_values(&cells);
                StatValue::Chips {
                    values: listing.shown,
                    remaining: listing.remaining,
                }
            } else {
                let result = aggregate_general(&cells, m.aggregate);
                match parse_number(&result) {
                    Some(value) => StatValue::Number {
                        value,
                        display: format_stat(value),
                    },
                    None => StatValue::Text { text: result },
                }
            };
            StatItem {
                label: m.label(),
                color: series_color(m, idx),
                value,
            }
        })
        .collect();
    RenderPlan::StatCard { items }
}

fn map_plan(widget: &Widget, rows: &[&Row]) -> RenderPlan {
    let (Some(lat_field), Some(lng_field)) = (non_empty(&widget.lat_field), non_empty(&widget.lng_field)) else {
        return RenderPlan::placeholder("Select latitude and longitude fields.");
    };

    let coords: Vec<(f64, f64, &Row)> = rows
        .iter()
        .filter_map(|r| Some((r.cell(lat_field).number()?, r.cell(lng_field).number()?, *r)))
        .collect();
    if coords.is_empty() {
        return RenderPlan::placeholder("No valid coordinates found.");
    }

    let n = coords.len() as f64;
    let center = GeoPoint {
        lat: coords.iter().map(|c| c.0).sum::<f64>() / n,
        lng: coords.iter().map(|c| c.1).sum::<f64>() / n,
    };
    let points = coords
        .iter()
        .take(MAP_POINT_LIMIT)
        .map(|(lat, lng, row)| MapPoint {
            lat: *lat,
            lng: *lng,
            data: (*row).clone(),
        })
        .collect();
    RenderPlan::Map {
        points,
        center,
        total_points: coords.len(),
    }
}

fn scatter_matrix_plan(widget: &Widget, rows: &[&Row]) -> RenderPlan {
    let candidates: Vec<&str> = match widget.matrix_fields.as_deref() {
        Some(fields) if !fields.is_empty() => fields.iter().map(String::as_str).collect(),
        _ => match non_empty(&widget.x_field) {
            Some(x) => std::iter::once(x)
                .chain(
                    configured_metrics(widget)
                        .into_iter()
                        .filter(|m| !m.is_count_sentinel())
                        .map(|m| m.field.as_str()),
                )
                .collect(),
            None => Vec::new(),
        },
    };

    let numeric: Vec<&str> = candidates
        .into_iter()
        .filter(|f| rows.iter().any(|r| r.cell(f).number().is_some()))
        .collect();
    if numeric.len() < 2 {
        return RenderPlan::placeholder("Choose at least 2 numeric variables.");
    }
    let fields: Vec<&str> = numeric.into_iter().take(MATRIX_FIELD_LIMIT).collect();
    let ranges: Vec<(f64, f64)> = fields
        .iter()
        .map(|f| min_max(&numbers(rows, f)).unwrap_or((0.0, 0.0)))
        .collect();

    let mut cells = Vec::with_capacity(fields.len() * fields.len());
    for (yi, y_field) in fields.iter().enumerate() {
        for (xi, x_field) in fields.iter().enumerate() {
            let points = rows
                .iter()
                .take(MATRIX_ROW_LIMIT)
                .filter_map(|r| {
                    let xv = r.cell(x_field).number()?;
                    let yv = r.cell(y_field).number()?;
                    Some(Point {
                        x: normalize(xv, ranges[xi]),
                        y: normalize(yv, ranges[yi]),
                    })
                })
                .collect();
            cells.push(MatrixCell {
                x_field: x_field.to_string(),
                y_field: y_field.to_string(),
                points,
            });
        }
    }
    RenderPlan::ScatterMatrix {
        fields: fields.iter().map(|f| f.to_string()).collect(),
        cells,
    }
}

fn field_plan(widget: &Widget, x: &str, rows: &[&Row]) -> RenderPlan {
    match widget.chart_type {
        ChartType::Histogram => histogram_plan(widget, x, rows),
        ChartType::Violin => violin_plan(widget, x, rows),
        ChartType::Pie => pie_plan(widget, x, rows),
        ChartType::Scatter => scatter_plan(widget, x, rows),
        ChartType::Bubble => bubble_plan(widget, x, rows),
        ChartType::BoxPlot => match BoxStats::from_values(&numbers(rows, x)) {
            Some(stats) => RenderPlan::BoxPlot { stats },
            None => RenderPlan::placeholder("No numeric data"),
        },
        ChartType::Heatmap => heatmap_plan(widget, rows),
        ChartType::Radar => radar_plan(widget, rows),
        ChartType::Sunburst => sunburst_plan(widget, x, rows),
        _ => series_plan(widget, x, rows),
    }
}

/// Numeric x values per non-empty group name.
fn grouped_numbers(rows: &[&Row], x: &str, group_field: &str, trim: bool) -> HashMap<String, Vec<f64>> {
    let mut groups: HashMap<String, Vec<f64>> = HashMap::new();
    for row in rows {
        let Some(v) = row.cell(x).number() else { continue };
        let mut name = display(row.cell(group_field));
        if trim {
            name = name.trim().to_string();
        }
        if name.is_empty() {
            continue;
        }
        groups.entry(name).or_default().push(v);
    }
    groups
}

fn sorted_group_names(groups: &HashMap<String, Vec<f64>>) -> Vec<String> {
    let mut names: Vec<String> = groups.keys().cloned().collect();
    names.sort();
    names.truncate(GROUP_LIMIT);
    names
}

fn group_legend(widget: &Widget, names: &[String]) -> Vec<LegendEntry> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| LegendEntry {
            label: name.clone(),
            color: category_color(widget, name, i),
        })
        .collect()
}

fn histogram_plan(widget: &Widget, x: &str, rows: &[&Row]) -> RenderPlan {
    let all = numbers(rows, x);
    let Some(binning) = Binning::over(&all, HISTOGRAM_BINS) else {
        return RenderPlan::placeholder("Histogram requires a numeric X variable.");
    };

    let Some(group_field) = non_empty(&widget.group_field) else {
        return RenderPlan::Histogram {
            bins: histogram(&all, HISTOGRAM_BINS),
        };
    };

    let groups = grouped_numbers(rows, x, group_field, false);
    let names = sorted_group_names(&groups);
    let counts: Vec<Vec<usize>> = names
        .iter()
        .map(|n| binning.counts(groups.get(n).map(Vec::as_slice).unwrap_or(&[])))
        .collect();
    let bins = (0..HISTOGRAM_BINS)
        .map(|i| GroupedBin {
            label: format!("{:.1}–{:.1}", binning.start(i), binning.end(i)),
            counts: counts.iter().map(|c| c[i]).collect(),
        })
        .collect();
    RenderPlan::GroupedHistogram {
        groups: group_legend(widget, &names),
        bins,
    }
}

fn violin_plan(widget: &Widget, x: &str, rows: &[&Row]) -> RenderPlan {
    let Some(group_field) = non_empty(&widget.group_field) else {
        let nums = numbers(rows, x);
        let bins = histogram(&nums, VIOLIN_BINS);
        let (Some(first), Some(last)) = (bins.first(), bins.last()) else {
            return RenderPlan::placeholder("Violin requires a numeric X variable.");
        };
        let step = if bins.len() > 1 {
            (last.center - first.center) / (bins.len() - 1) as f64
        } else {
            1.0
        };
        let mut points = Vec::with_capacity(bins.len() + 2);
        points.push(ViolinPoint {
            x: first.center - step,
            up: 0.0,
            down: 0.0,
        });
        points.extend(bins.iter().map(|b| ViolinPoint {
            x: b.center,
            up: b.count as f64,
            down: -(b.count as f64),
        }));
        points.push(ViolinPoint {
            x: last.center + step,
            up: 0.0,
            down: 0.0,
        });
        return RenderPlan::Violin { points };
    };

    let groups = grouped_numbers(rows, x, group_field, true);
    let names = sorted_group_names(&groups);
    if names.is_empty() {
        return RenderPlan::placeholder("No groups found. Select a valid categorical field for \"Group By\".");
    }
    let all: Vec<f64> = groups.values().flatten().copied().collect();
    let Some(binning) = Binning::over(&all, GROUPED_VIOLIN_BINS) else {
        return RenderPlan::placeholder("No numeric data found in the X field.");
    };

    let densities: Vec<Vec<f64>> = names
        .iter()
        .map(|n| {
            let values = groups.get(n).map(Vec::as_slice).unwrap_or(&[]);
            let total = values.len().max(1) as f64;
            binning.counts(values).into_iter().map(|c| c as f64 / total).collect()
        })
        .collect();
    let points = (0..GROUPED_VIOLIN_BINS)
        .map(|i| {
            let widths: Vec<f64> = densities.iter().map(|d| d[i] * VIOLIN_WIDTH).collect();
            GroupedViolinPoint {
                x: round2(binning.center(i)),
                up: widths.iter().enumerate().map(|(g, w)| g as f64 + w).collect(),
                down: widths.iter().enumerate().map(|(g, w)| g as f64 - w).collect(),
            }
        })
        .collect();
    RenderPlan::GroupedViolin {
        groups: group_legend(widget, &names),
        points,
    }
}

fn pie_plan(widget: &Widget, x: &str, rows: &[&Row]) -> RenderPlan {
    let series = series_metrics(widget);
    let metric = &series[0];
    let metric_color = series_color(metric, 0);
    let slices: Vec<PieSlice> = group_by(rows, x)
        .into_iter()
        .enumerate()
        .map(|(i, (name, group))| PieSlice {
            value: series_value(metric, &group),
            color: if widget.color_by_category {
                category_color(widget, &name, i)
            } else {
                metric_color.clone()
            },
            name,
        })
        .collect();
    let legend = if widget.color_by_category {
        slices
            .iter()
            .map(|s| LegendEntry {
                label: s.name.clone(),
                color: s.color.clone(),
            })
            .collect()
    } else {
        series
            .iter()
            .enumerate()
            .map(|(i, m)| LegendEntry {
                label: m.label(),
                color: series_color(m, i),
            })
            .collect()
    };
    RenderPlan::Pie { slices, legend }
}

fn scatter_plan(widget: &Widget, x: &str, rows: &[&Row]) -> RenderPlan {
    let Some(metric) = configured_metrics(widget).into_iter().next() else {
        return RenderPlan::placeholder("Select Y variable.");
    };
    let points = rows
        .iter()
        .filter_map(|r| {
            Some(Point {
                x: r.cell(x).number()?,
                y: r.cell(&metric.field).number()?,
            })
        })
        .collect();
    RenderPlan::Scatter {
        series: series_info(metric, 0),
        points,
    }
}

fn bubble_plan(widget: &Widget, x: &str, rows: &[&Row]) -> RenderPlan {
    let metrics = configured_metrics(widget);
    let Some(metric) = metrics.first() else {
        return RenderPlan::placeholder("Select Y variable.");
    };
    let Some(size_field) = non_empty(&widget.size_field).or_else(|| metrics.get(1).map(|m| m.field.as_str()))
    else {
        return RenderPlan::placeholder("Select size variable (3rd metric).");
    };

    let raw: Vec<(f64, f64, f64)> = rows
        .iter()
        .filter_map(|r| {
            Some((
                r.cell(x).number()?,
                r.cell(&metric.field).number()?,
                r.cell(size_field).number()?,
            ))
        })
        .collect();
    let zs: Vec<f64> = raw.iter().map(|p| p.2).collect();
    let (min_z, max_z) = min_max(&zs).unwrap_or((0.0, 0.0));
    let range = if max_z == min_z { 1.0 } else { max_z - min_z };
    let points = raw
        .into_iter()
        .map(|(x, y, z)| BubblePoint {
            x,
            y,
            z: BUBBLE_MIN + (z - min_z) / range * (BUBBLE_MAX - BUBBLE_MIN),
        })
        .collect();
    RenderPlan::Bubble {
        series: series_info(metric, 0),
        size_field: size_field.to_string(),
        points,
    }
}

fn matrix_fields(widget: &Widget) -> Vec<&str> {
    widget
        .matrix_fields
        .iter()
        .flatten()
        .map(String::as_str)
        .filter(|f| !f.is_empty())
        .collect()
}

fn heatmap_plan(widget: &Widget, rows: &[&Row]) -> RenderPlan {
    let fields = matrix_fields(widget);
    if fields.len() < 2 {
        return RenderPlan::placeholder("Select at least 2 numeric variables for heatmap");
    }
    let fields: Vec<&str> = fields.into_iter().take(MATRIX_FIELD_LIMIT).collect();

    let matrix = fields
        .iter()
        .map(|a| {
            fields
                .iter()
                .map(|b| {
                    // pairwise-complete rows only
                    let pairs: Vec<(f64, f64)> = rows
                        .iter()
                        .filter_map(|r| Some((r.cell(a).number()?, r.cell(b).number()?)))
                        .collect();
                    pearson(&pairs)
                })
                .collect()
        })
        .collect();
    RenderPlan::Heatmap {
        fields: fields.iter().map(|f| f.to_string()).collect(),
        matrix,
    }
}

fn radar_plan(widget: &Widget, rows: &[&Row]) -> RenderPlan {
    let fields = matrix_fields(widget);
    if fields.len() < 3 {
        return RenderPlan::placeholder("Select at least 3 numeric variables for radar chart");
    }
    let averages = |group: &[&Row]| -> Vec<f64> {
        fields
            .iter()
            .map(|f| aggregate(&numbers(group, f), AggregateMethod::Mean))
            .collect()
    };

    let category = non_empty(&widget.category_field).or_else(|| non_empty(&widget.group_field));
    let series = match category {
        Some(cf) if !rows.is_empty() => group_by(rows, cf)
            .into_iter()
            .enumerate()
            .map(|(i, (name, group))| RadarSeries {
                name,
                color: metric_color(i).to_string(),
                values: averages(&group),
            })
            .collect(),
        _ => vec![RadarSeries {
            name: "value".to_string(),
            color: metric_color(0).to_string(),
            values: averages(rows),
        }],
    };
    RenderPlan::Radar {
        variables: fields.iter().map(|f| f.to_string()).collect(),
        series,
    }
}

fn sunburst_plan(widget: &Widget, x: &str, rows: &[&Row]) -> RenderPlan {
    let category = non_empty(&widget.category_field).unwrap_or(x);
    let metric = series_metrics(widget).swap_remove(0);

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut nodes: Vec<SunburstNode> = Vec::new();
    for row in rows {
        let cell = row.cell(category);
        let name = if cell.is_blank() {
            "Unknown".to_string()
        } else {
            display(cell)
        };
        let value = if metric.is_count_sentinel() {
            1.0
        } else {
            row.cell(&metric.field).number().unwrap_or(1.0)
        };
        match index.get(&name) {
            Some(&i) => nodes[i].value += value,
            None => {
                index.insert(name.clone(), nodes.len());
                nodes.push(SunburstNode { name, value });
            }
        }
    }
    RenderPlan::Sunburst { nodes }
}

fn is_bar_family(chart: ChartType) -> bool {
    matches!(chart, ChartType::Bar | ChartType::GroupedBar | ChartType::StackedBar)
}

fn series_plan(widget: &Widget, x: &str, rows: &[&Row]) -> RenderPlan {
    let series = series_metrics(widget);
    let mut points: Vec<SeriesPoint> = group_by(rows, x)
        .into_iter()
        .map(|(x, group)| SeriesPoint {
            values: series.iter().map(|m| series_value(m, &group)).collect(),
            x,
        })
        .collect();

    if widget.chart_type == ChartType::Bar {
        // stable: equal values keep discovery order
        let first = |p: &SeriesPoint| p.values.first().copied().unwrap_or(0.0);
        points.sort_by(|a, b| first(b).total_cmp(&first(a)));
    }

    let mut caption = None;
    if is_bar_family(widget.chart_type) && points.len() > BAR_CATEGORY_LIMIT {
        caption = Some(format!(
            "Showing top {} of {} categories",
            BAR_CATEGORY_LIMIT,
            points.len()
        ));
        points.truncate(BAR_CATEGORY_LIMIT);
    }

    let categorical_x = points
        .iter()
        .any(|p| !p.x.trim().is_empty() && parse_number(&p.x).is_none());

    let category_legend = (widget.chart_type == ChartType::Bar
        && widget.color_by_category
        && series.len() == 1)
        .then(|| {
            points
                .iter()
                .enumerate()
                .map(|(i, p)| LegendEntry {
                    label: p.x.clone(),
                    color: category_color(widget, &p.x, i),
                })
                .collect()
        });

    RenderPlan::Series(SeriesPlan {
        chart_type: widget.chart_type,
        series: series.iter().enumerate().map(|(i, m)| series_info(m, i)).collect(),
        points,
        categorical_x,
        caption,
        category_legend,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tileboard_ir::{TileFilter, TileFilterOperator};

    fn sightings() -> Vec<Row> {
        vec![
            Row::new().with("species", "heron").with("count", 4).with("depth", 1.5),
            Row::new().with("species", "egret").with("count", 2).with("depth", 2.5),
            Row::new().with("species", "heron").with("count", 6).with("depth", 3.0),
            Row::new().with("species", "ibis").with("count", "n/a").with("depth", 0.5),
        ]
    }

    fn widget(chart: ChartType) -> Widget {
        let mut w = Widget::new("w", "t", "sightings", chart);
        w.x_field = Some("species".to_string());
        w
    }

    #[test]
    fn test_format_stat() {
        assert_eq!(format_stat(1234567.0), "1,234,567");
        assert_eq!(format_stat(1234.5678), "1,234.57");
        assert_eq!(format_stat(2.5), "2.5");
        assert_eq!(format_stat(-1000.0), "-1,000");
        assert_eq!(format_stat(999.0), "999");
    }

    #[test]
    fn test_missing_x_field() {
        let mut w = widget(ChartType::Line);
        w.x_field = None;
        let plan = render_widget(&w, &sightings());
        assert_eq!(plan, RenderPlan::placeholder("Select an X field."));
    }

    #[test]
    fn test_count_series_when_no_metrics() {
        let plan = render_widget(&widget(ChartType::Line), &sightings());
        let RenderPlan::Series(series) = plan else {
            panic!("expected series plan");
        };
        assert_eq!(series.series[0].label, "Count");
        assert_eq!(series.points[0].x, "heron");
        assert_eq!(series.points[0].values, vec![2.0]);
        assert!(series.categorical_x);
    }

    #[test]
    fn test_tile_filters_apply_first() {
        let mut w = widget(ChartType::Table);
        w.filters = Some(vec![TileFilter::new("f", "count", TileFilterOperator::Gt).with_value("3")]);
        let RenderPlan::Table { rows, total_rows, columns } = render_widget(&w, &sightings()) else {
            panic!("expected table plan");
        };
        assert_eq!(total_rows, 2);
        assert_eq!(columns, vec!["species", "count", "depth"]);
        assert_eq!(rows[1], vec!["heron", "6", "3"]);
    }

    #[test]
    fn test_stat_card_values() {
        let mut w = widget(ChartType::StatCard);
        w.metrics = vec![
            Metric::new("count", AggregateMethod::Sum),
            Metric::new("species", AggregateMethod::Distinct),
            Metric::new("species", AggregateMethod::Mode).with_label("Top species"),
        ];
        let RenderPlan::StatCard { items } = render_widget(&w, &sightings()) else {
            panic!("expected stat card");
        };
        assert_eq!(
            items[0].value,
            StatValue::Number {
                value: 12.0,
                display: "12".to_string()
            }
        );
        assert_eq!(
            items[1].value,
            StatValue::Chips {
                values: vec!["egret".to_string(), "heron".to_string(), "ibis".to_string()],
                remaining: 0
            }
        );
        assert_eq!(items[2].label, "Top species");
        assert_eq!(items[2].value, StatValue::Text { text: "heron".to_string() });
        assert_eq!(items[1].color, "#16a34a");
    }

    #[test]
    fn test_stat_card_fallbacks() {
        let plan = render_widget(&widget(ChartType::StatCard), &sightings());
        let RenderPlan::StatCard { items } = plan else {
            panic!("expected stat card");
        };
        assert_eq!(items[0].label, "count(species)");

        let mut bare = widget(ChartType::StatCard);
        bare.x_field = None;
        assert!(render_widget(&bare, &sightings()).is_placeholder());
    }

    #[test]
    fn test_note_and_map_placeholders() {
        let mut note = widget(ChartType::Note);
        note.note_content = Some("Survey paused in March".to_string());
        assert_eq!(
            render_widget(&note, &sightings()),
            RenderPlan::Note {
                content: Some("Survey paused in March".to_string())
            }
        );

        let mut map = widget(ChartType::Map);
        assert_eq!(
            render_widget(&map, &sightings()),
            RenderPlan::placeholder("Select latitude and longitude fields.")
        );
        map.lat_field = Some("species".to_string());
        map.lng_field = Some("species".to_string());
        assert_eq!(
            render_widget(&map, &sightings()),
            RenderPlan::placeholder("No valid coordinates found.")
        );
    }

    #[test]
    fn test_map_center_and_points() {
        let rows = vec![
            Row::new().with("lat", 10.0).with("lng", 20.0),
            Row::new().with("lat", "12").with("lng", 22.0),
            Row::new().with("lat", "north").with("lng", 0.0),
        ];
        let mut w = widget(ChartType::Map);
        w.lat_field = Some("lat".to_string());
        w.lng_field = Some("lng".to_string());
        let RenderPlan::Map { points, center, total_points } = render_widget(&w, &rows) else {
            panic!("expected map");
        };
        assert_eq!(total_points, 2);
        assert_eq!(points.len(), 2);
        assert_eq!(center, GeoPoint { lat: 11.0, lng: 21.0 });
    }

    #[test]
    fn test_histogram_needs_numeric_x() {
        let plan = render_widget(&widget(ChartType::Histogram), &sightings());
        assert_eq!(plan, RenderPlan::placeholder("Histogram requires a numeric X variable."));
    }

    #[test]
    fn test_grouped_histogram() {
        let mut w = widget(ChartType::Histogram);
        w.x_field = Some("depth".to_string());
        w.group_field = Some("species".to_string());
        let RenderPlan::GroupedHistogram { groups, bins } = render_widget(&w, &sightings()) else {
            panic!("expected grouped histogram");
        };
        let names: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(names, vec!["egret", "heron", "ibis"]);
        assert_eq!(bins.len(), HISTOGRAM_BINS);
        assert_eq!(bins[0].label, "0.5–0.7");
        let heron_total: usize = bins.iter().map(|b| b.counts[1]).sum();
        assert_eq!(heron_total, 2);
    }

    #[test]
    fn test_grouped_violin_mirrors() {
        let mut w = widget(ChartType::Violin);
        w.x_field = Some("depth".to_string());
        w.group_field = Some("species".to_string());
        let RenderPlan::GroupedViolin { groups, points } = render_widget(&w, &sightings()) else {
            panic!("expected grouped violin");
        };
        assert_eq!(groups.len(), 3);
        assert_eq!(points.len(), 18);
        for p in &points {
            for g in 0..3 {
                let base = g as f64;
                assert!((p.up[g] - base) >= 0.0);
                assert!(((p.up[g] - base) - (base - p.down[g])).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_single_violin_padding() {
        let mut w = widget(ChartType::Violin);
        w.x_field = Some("depth".to_string());
        let RenderPlan::Violin { points } = render_widget(&w, &sightings()) else {
            panic!("expected violin");
        };
        assert_eq!(points.len(), 16);
        assert_eq!(points[0].up, 0.0);
        assert_eq!(points[15].down, 0.0);
    }

    #[test]
    fn test_scatter_and_bubble() {
        let mut scatter = widget(ChartType::Scatter);
        scatter.x_field = Some("depth".to_string());
        assert_eq!(
            render_widget(&scatter, &sightings()),
            RenderPlan::placeholder("Select Y variable.")
        );
        scatter.metrics.push(Metric::new("count", AggregateMethod::Sum));
        let RenderPlan::Scatter { points, .. } = render_widget(&scatter, &sightings()) else {
            panic!("expected scatter");
        };
        assert_eq!(points.len(), 3);

        let mut bubble = scatter.clone();
        bubble.chart_type = ChartType::Bubble;
        assert_eq!(
            render_widget(&bubble, &sightings()),
            RenderPlan::placeholder("Select size variable (3rd metric).")
        );
        bubble.size_field = Some("count".to_string());
        let RenderPlan::Bubble { points, .. } = render_widget(&bubble, &sightings()) else {
            panic!("expected bubble");
        };
        let zs: Vec<f64> = points.iter().map(|p| p.z).collect();
        assert_eq!(zs, vec![225.0, 50.0, 400.0]);
    }

    #[test]
    fn test_box_plot() {
        let mut w = widget(ChartType::BoxPlot);
        assert_eq!(render_widget(&w, &sightings()), RenderPlan::placeholder("No numeric data"));
        w.x_field = Some("count".to_string());
        let RenderPlan::BoxPlot { stats } = render_widget(&w, &sightings()) else {
            panic!("expected box plot");
        };
        assert_eq!((stats.min, stats.median, stats.max), (2.0, 4.0, 6.0));
    }

    #[test]
    fn test_heatmap_self_correlation() {
        let mut w = widget(ChartType::Heatmap);
        w.matrix_fields = Some(vec!["count".to_string()]);
        assert!(render_widget(&w, &sightings()).is_placeholder());

        w.matrix_fields = Some(vec!["count".to_string(), "depth".to_string(), "species".to_string()]);
        let RenderPlan::Heatmap { matrix, fields } = render_widget(&w, &sightings()) else {
            panic!("expected heatmap");
        };
        assert_eq!(fields.len(), 3);
        assert_eq!(matrix[0][0], 1.0);
        assert_eq!(matrix[1][1], 1.0);
        // no numeric values at all
        assert_eq!(matrix[2][2], 0.0);
        assert_eq!(matrix[0][1], matrix[1][0]);
    }

    #[test]
    fn test_radar_series_per_category() {
        let mut w = widget(ChartType::Radar);
        w.matrix_fields = Some(vec!["count".to_string(), "depth".to_string()]);
        assert!(render_widget(&w, &sightings()).is_placeholder());

        w.matrix_fields = Some(vec!["count".to_string(), "depth".to_string(), "depth".to_string()]);
        w.category_field = Some("species".to_string());
        let RenderPlan::Radar { series, variables } = render_widget(&w, &sightings()) else {
            panic!("expected radar");
        };
        assert_eq!(variables.len(), 3);
        let names: Vec<&str> = series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["heron", "egret", "ibis"]);
        assert_eq!(series[0].values[0], 5.0);
        assert_eq!(series[2].values[0], 0.0);
    }

    #[test]
    fn test_sunburst_sums() {
        let mut w = widget(ChartType::Sunburst);
        w.metrics.push(Metric::new("count", AggregateMethod::Sum));
        let mut rows = sightings();
        rows.push(Row::new().with("count", 3));
        let RenderPlan::Sunburst { nodes } = render_widget(&w, &rows) else {
            panic!("expected sunburst");
        };
        assert_eq!(nodes[0], SunburstNode { name: "heron".to_string(), value: 10.0 });
        // non-numeric value counts as 1
        assert_eq!(nodes[2], SunburstNode { name: "ibis".to_string(), value: 1.0 });
        assert_eq!(nodes[3], SunburstNode { name: "Unknown".to_string(), value: 3.0 });
    }

    #[test]
    fn test_pie_category_colors() {
        let mut w = widget(ChartType::Pie);
        w.color_by_category = true;
        let RenderPlan::Pie { slices, legend } = render_widget(&w, &sightings()) else {
            panic!("expected pie");
        };
        assert_eq!(slices.len(), 3);
        assert_eq!(slices[1].color, "#16a34a");
        assert_eq!(legend[2].label, "ibis");
    }

    #[test]
    fn test_scatter_matrix_fields() {
        let mut w = widget(ChartType::ScatterMatrix);
        assert_eq!(
            render_widget(&w, &sightings()),
            RenderPlan::placeholder("Choose at least 2 numeric variables.")
        );
        w.matrix_fields = Some(vec!["species".to_string(), "count".to_string(), "depth".to_string()]);
        let RenderPlan::ScatterMatrix { fields, cells } = render_widget(&w, &sightings()) else {
            panic!("expected scatter matrix");
        };
        assert_eq!(fields, vec!["count", "depth"]);
        assert_eq!(cells.len(), 4);
        for cell in &cells {
            for p in &cell.points {
                assert!((0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y));
            }
        }
    }
}
