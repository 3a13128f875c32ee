//! Tileboard evaluation engine
//!
//! Filters rows, aggregates them per tile and resolves render plans. Every
//! operation is a synchronous function of its inputs; nothing here performs I/O.

pub mod aggregate;
pub mod assembly;
pub mod dashboard;
pub mod filter;
pub mod palette;
pub mod plan;
pub mod render;
pub mod stats;

pub use aggregate::{aggregate, aggregate_cells, aggregate_general, distinct_values, DistinctValues};
pub use assembly::{AssemblyError, TileDraft};
pub use dashboard::{Dashboard, DashboardError, LayoutUpdate, WidgetRender};
pub use filter::{apply_global_filters, apply_tile_filters, GlobalFilterEvaluator, TileFilterEvaluator};
pub use plan::RenderPlan;
pub use render::render_widget;
