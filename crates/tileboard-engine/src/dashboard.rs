//! Dashboard composition
//!
//! A [`Dashboard`] is the mutable, in-memory form of a [`Visualization`]:
//! widgets are added, edited, moved and rendered here, and the result is frozen
//! into a document on save.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tileboard_ir::{GlobalFilter, Layout, Row, TileFilter, Visualization, Widget, GRID_COLUMNS};
use tracing::{debug, info};
use uuid::Uuid;

use crate::filter::GlobalFilterEvaluator;
use crate::plan::RenderPlan;
use crate::render::render_widget;

/// Smallest width or height a tile can be resized to.
pub const MIN_TILE_SPAN: u32 = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DashboardError {
    #[error("Duplicate widget id: {0}")]
    DuplicateWidget(String),

    #[error("Unknown widget: {0}")]
    UnknownWidget(String),

    #[error("Widget {widget} has no metric at index {index}")]
    UnknownMetric { widget: String, index: usize },

    #[error("Dashboard name is required.")]
    MissingName,

    #[error("Add at least one tile before saving.")]
    NoWidgets,
}

/// Position reported back by the grid layout engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LayoutUpdate {
    pub id: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// One rendered tile, positioned on the grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetRender {
    pub widget_id: String,
    pub title: String,
    pub layout: Layout,
    pub show_legend: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis_label: Option<String>,
    pub plan: RenderPlan,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dashboard {
    pub name: String,
    pub description: String,
    pub widgets: Vec<Widget>,
    pub global_filters: Vec<GlobalFilter>,
}

impl Dashboard {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn from_visualization(vis: Visualization) -> Self {
        Self {
            name: vis.name,
            description: vis.description.unwrap_or_default(),
            widgets: vis.widgets,
            global_filters: vis.global_filters,
        }
    }

    /// Lowest occupied grid row.
    fn bottom(&self) -> u32 {
        self.widgets.iter().map(|w| w.layout.bottom()).max().unwrap_or(0)
    }

    /// Append a widget in the left column below every existing tile.
    pub fn add_widget(&mut self, mut widget: Widget) -> Result<&Widget, DashboardError> {
        if self.widgets.iter().any(|w| w.id == widget.id) {
            return Err(DashboardError::DuplicateWidget(widget.id));
        }
        widget.layout.x = 0;
        widget.layout.y = self.bottom();
        debug!(widget = %widget.id, y = widget.layout.y, "added widget");
        self.widgets.push(widget);
        Ok(&self.widgets[self.widgets.len() - 1])
    }

    pub fn remove_widget(&mut self, id: &str) -> Option<Widget> {
        let pos = self.widgets.iter().position(|w| w.id == id)?;
        Some(self.widgets.remove(pos))
    }

    pub fn widget_mut(&mut self, id: &str) -> Result<&mut Widget, DashboardError> {
        self.widgets
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| DashboardError::UnknownWidget(id.to_string()))
    }

    /// Apply grid positions. Unknown ids are ignored; spans are clamped to the grid.
    pub fn apply_layout(&mut self, updates: &[LayoutUpdate]) -> usize {
        let mut applied = 0;
        for update in updates {
            let Some(widget) = self.widgets.iter_mut().find(|w| w.id == update.id) else {
                continue;
            };
            let w = update.w.clamp(MIN_TILE_SPAN, GRID_COLUMNS);
            widget.layout = Layout {
                x: update.x.min(GRID_COLUMNS - w),
                y: update.y,
                w,
                h: update.h.max(MIN_TILE_SPAN),
            };
            applied += 1;
        }
        applied
    }

    pub fn set_metric_color(&mut self, widget_id: &str, index: usize, color: &str) -> Result<(), DashboardError> {
        let widget = self.widget_mut(widget_id)?;
        let metric = widget
            .metrics
            .get_mut(index)
            .ok_or_else(|| DashboardError::UnknownMetric {
                widget: widget_id.to_string(),
                index,
            })?;
        metric.color = Some(color.to_string());
        Ok(())
    }

    pub fn set_metric_label(&mut self, widget_id: &str, index: usize, label: &str) -> Result<(), DashboardError> {
        let widget = self.widget_mut(widget_id)?;
        let metric = widget
            .metrics
            .get_mut(index)
            .ok_or_else(|| DashboardError::UnknownMetric {
                widget: widget_id.to_string(),
                index,
            })?;
        metric.legend_label = label.to_string();
        Ok(())
    }

    pub fn set_category_color(&mut self, widget_id: &str, category: &str, color: &str) -> Result<(), DashboardError> {
        let widget = self.widget_mut(widget_id)?;
        widget
            .category_colors
            .get_or_insert_with(BTreeMap::new)
            .insert(category.to_string(), color.to_string());
        Ok(())
    }

    /// Replace a widget's tile filters; inert filters are dropped.
    pub fn set_tile_filters(&mut self, widget_id: &str, filters: Vec<TileFilter>) -> Result<(), DashboardError> {
        let widget = self.widget_mut(widget_id)?;
        let active: Vec<TileFilter> = filters.into_iter().filter(TileFilter::is_active).collect();
        widget.filters = (!active.is_empty()).then_some(active);
        Ok(())
    }

    /// Add a global filter, replacing one with the same id.
    pub fn add_global_filter(&mut self, filter: GlobalFilter) {
        match self.global_filters.iter_mut().find(|f| f.id == filter.id) {
            Some(existing) => *existing = filter,
            None => self.global_filters.push(filter),
        }
    }

    pub fn remove_global_filter(&mut self, id: &str) -> bool {
        let before = self.global_filters.len();
        self.global_filters.retain(|f| f.id != id);
        self.global_filters.len() != before
    }

    /// Rows of `table` visible after the dashboard's global filters.
    pub fn rows_for<'r>(&self, table: &str, rows: &'r [Row]) -> Vec<&'r Row> {
        GlobalFilterEvaluator::new(&self.global_filters, table).filter(rows)
    }

    /// Render every widget against its table's rows.
    pub fn render(&self, rows_by_table: &HashMap<String, Vec<Row>>) -> Vec<WidgetRender> {
        self.widgets
            .iter()
            .map(|widget| {
                let rows = rows_by_table.get(&widget.table).map(Vec::as_slice).unwrap_or(&[]);
                let visible = self.rows_for(&widget.table, rows);
                WidgetRender {
                    widget_id: widget.id.clone(),
                    title: widget.title.clone(),
                    layout: widget.layout,
                    show_legend: widget.show_legend,
                    x_axis_label: widget.x_axis_label.clone(),
                    y_axis_label: widget.y_axis_label.clone(),
                    plan: render_widget(widget, visible),
                }
            })
            .collect()
    }

    /// Freeze into a new persisted document.
    pub fn to_visualization(&self, program_id: Option<&str>) -> Result<Visualization, DashboardError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DashboardError::MissingName);
        }
        if self.widgets.is_empty() {
            return Err(DashboardError::NoWidgets);
        }
        let description = self.description.trim();

        let vis = Visualization {
            id: Uuid::new_v4().to_string(),
            program_id: program_id.map(str::to_string),
            name: name.to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            widgets: self.widgets.clone(),
            global_filters: self.global_filters.clone(),
            created_at: Utc::now().to_rfc3339(),
        };
        info!(visualization = %vis.id, widgets = vis.widgets.len(), "saved dashboard");
        Ok(vis)
    }
}
