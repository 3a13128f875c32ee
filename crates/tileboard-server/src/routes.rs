//! HTTP API
//!
//! Provides REST endpoints for:
//! - Table listing and schema introspection
//! - Chart-type suggestion and the chart catalog
//! - Saving, loading and rendering dashboards

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tileboard_engine::{Dashboard, WidgetRender};
use tileboard_ir::{TableSchema, Visualization};
use tileboard_registry::{suggest_for_columns, ChartRegistry, ChartSpec};
use tracing::{warn, Level};

use crate::log_event;
use crate::provider::{ProviderError, TableDataProvider};
use crate::store::{DocumentStore, NewVisualization, StoreError};

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn TableDataProvider>,
    pub store: Arc<DocumentStore>,
    pub registry: Arc<ChartRegistry>,
    pub row_limit: usize,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Provider(ProviderError::TableNotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Provider(ProviderError::InvalidName(_)) => StatusCode::BAD_REQUEST,
            ApiError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::MissingName)
            | ApiError::Store(StoreError::Document(_))
            | ApiError::Store(StoreError::InvalidName(_)) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct TablesResponse {
    pub tables: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    pub project: String,
    pub table: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestResponse {
    pub chart_types: Vec<ChartSpec>,
}

#[derive(Debug, Serialize)]
pub struct ChartsResponse {
    pub version: String,
    pub charts: Vec<ChartSpec>,
}

#[derive(Debug, Serialize)]
pub struct VisualizationResponse {
    #[serde(flatten)]
    pub visualization: Visualization,
    pub fingerprint: String,
}

#[derive(Debug, Serialize)]
pub struct RenderResponse {
    pub id: String,
    pub name: String,
    pub fingerprint: String,
    pub widgets: Vec<WidgetRender>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/tables/:project", get(list_tables))
        .route("/api/tables/:project/:table/schema", get(table_schema))
        .route("/api/suggest", post(suggest))
        .route("/api/charts", get(list_charts))
        .route(
            "/api/programs/:program/visualizations",
            get(list_visualizations).post(create_visualization),
        )
        .route("/api/programs/:program/visualizations/:id", get(get_visualization))
        .route("/api/programs/:program/visualizations/:id/render", get(render_visualization))
        .with_state(state)
}

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn list_tables(State(state): State<AppState>, Path(project): Path<String>) -> ApiResult<Json<TablesResponse>> {
    let tables = state.provider.tables(&project).await?;
    Ok(Json(TablesResponse { tables }))
}

pub async fn table_schema(
    State(state): State<AppState>,
    Path((project, table)): Path<(String, String)>,
) -> ApiResult<Json<TableSchema>> {
    Ok(Json(state.provider.schema(&project, &table).await?))
}

pub async fn suggest(State(state): State<AppState>, Json(req): Json<SuggestRequest>) -> ApiResult<Json<SuggestResponse>> {
    let schema = state.provider.schema(&req.project, &req.table).await?;
    let chart_types = suggest_for_columns(&req.fields, &schema.columns)
        .into_iter()
        .filter_map(|chart| state.registry.spec(chart).cloned())
        .collect();
    Ok(Json(SuggestResponse { chart_types }))
}

pub async fn list_charts(State(state): State<AppState>) -> Json<ChartsResponse> {
    Json(ChartsResponse {
        version: state.registry.version().to_string(),
        charts: state.registry.charts().into_iter().cloned().collect(),
    })
}

pub async fn list_visualizations(State(state): State<AppState>, Path(program): Path<String>) -> Json<Vec<Visualization>> {
    Json(state.store.list(&program).await)
}

pub async fn create_visualization(
    State(state): State<AppState>,
    Path(program): Path<String>,
    Json(req): Json<NewVisualization>,
) -> ApiResult<(StatusCode, Json<Visualization>)> {
    let vis = state.store.create(&program, req).await?;
    log_event!(
        level: Level::INFO,
        event: "visualization_created",
        program: program,
        id: vis.id,
        widgets: vis.widgets.len()
    );
    Ok((StatusCode::CREATED, Json(vis)))
}

pub async fn get_visualization(
    State(state): State<AppState>,
    Path((program, id)): Path<(String, String)>,
) -> ApiResult<Json<VisualizationResponse>> {
    let visualization = state.store.get(&program, &id).await?;
    let fingerprint = visualization.fingerprint();
    Ok(Json(VisualizationResponse {
        visualization,
        fingerprint,
    }))
}

/// Render every widget with rows from the program's tables. A table the
/// provider does not know, or whose name it rejects, renders as empty.
pub async fn render_visualization(
    State(state): State<AppState>,
    Path((program, id)): Path<(String, String)>,
) -> ApiResult<Json<RenderResponse>> {
    let started = Instant::now();
    let vis = state.store.get(&program, &id).await?;

    let mut rows_by_table = HashMap::new();
    for table in vis.tables() {
        let rows = match state.provider.rows(&program, table, state.row_limit, 0).await {
            Ok(rows) => rows,
            Err(e @ (ProviderError::TableNotFound { .. } | ProviderError::InvalidName(_))) => {
                warn!(program = %program, table, error = %e, "rendering without rows for unavailable table");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        rows_by_table.insert(table.to_string(), rows);
    }

    let fingerprint = vis.fingerprint();
    let (vis_id, name) = (vis.id.clone(), vis.name.clone());
    let widgets = Dashboard::from_visualization(vis).render(&rows_by_table);

    log_event!(
        level: Level::DEBUG,
        event: "visualization_rendered",
        id: vis_id,
        widgets: widgets.len(),
        duration_ms: started.elapsed().as_millis()
    );
    Ok(Json(RenderResponse {
        id: vis_id,
        name,
        fingerprint,
        widgets,
    }))
}
