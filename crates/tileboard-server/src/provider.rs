//! Table data providers
//!
//! The engine never fetches data itself. The server asks a [`TableDataProvider`]
//! for a table's columns and a page of rows, keyed by (project, table).

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tileboard_ir::{ColumnSchema, Row, TableSchema};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Table not found: {project}/{table}")]
    TableNotFound { project: String, table: String },

    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    #[error("Failed to read table data: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed table file: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait TableDataProvider: Send + Sync {
    /// Table names of a project, sorted.
    async fn tables(&self, project: &str) -> Result<Vec<String>, ProviderError>;

    async fn schema(&self, project: &str, table: &str) -> Result<TableSchema, ProviderError>;

    async fn rows(&self, project: &str, table: &str, limit: usize, offset: usize) -> Result<Vec<Row>, ProviderError>;
}

/// Project and table names become path segments; reject anything that could escape the root.
pub fn check_name(name: &str) -> Result<&str, ProviderError> {
    let bad = name.is_empty() || name == "." || name.contains("..") || name.contains(['/', '\\', '\0']);
    if bad {
        Err(ProviderError::InvalidName(name.to_string()))
    } else {
        Ok(name)
    }
}

#[derive(Debug, Deserialize)]
struct RawColumn {
    name: String,
    #[serde(rename = "type")]
    raw_type: String,
}

#[derive(Debug, Deserialize)]
struct TableFile {
    #[serde(default)]
    columns: Vec<RawColumn>,
    #[serde(default)]
    rows: Vec<Row>,
}

/// Tables stored as `<root>/<project>/<table>.json`.
///
/// Each file holds `{"columns": [{"name", "type"}], "rows": [...]}`. Schemas are
/// resolved once per (project, table) and cached for the life of the provider.
pub struct JsonDirProvider {
    root: PathBuf,
    schemas: RwLock<HashMap<(String, String), TableSchema>>,
}

impl JsonDirProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            schemas: RwLock::new(HashMap::new()),
        }
    }

    fn table_path(&self, project: &str, table: &str) -> Result<PathBuf, ProviderError> {
        Ok(self
            .root
            .join(check_name(project)?)
            .join(format!("{}.json", check_name(table)?)))
    }

    async fn read_table(&self, project: &str, table: &str) -> Result<TableFile, ProviderError> {
        let path = self.table_path(project, table)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProviderError::TableNotFound {
                    project: project.to_string(),
                    table: table.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl TableDataProvider for JsonDirProvider {
    async fn tables(&self, project: &str) -> Result<Vec<String>, ProviderError> {
        let dir = self.root.join(check_name(project)?);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut tables = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                tables.push(stem.to_string());
            }
        }
        tables.sort();
        Ok(tables)
    }

    async fn schema(&self, project: &str, table: &str) -> Result<TableSchema, ProviderError> {
        let key = (project.to_string(), table.to_string());
        if let Some(schema) = self.schemas.read().await.get(&key) {
            return Ok(schema.clone());
        }

        let file = self.read_table(project, table).await?;
        let columns = file
            .columns
            .into_iter()
            .map(|c| ColumnSchema::new(c.name, c.raw_type))
            .collect();
        let schema = TableSchema::new(project, table, columns);
        debug!(project, table, columns = schema.columns.len(), "resolved table schema");

        self.schemas.write().await.insert(key, schema.clone());
        Ok(schema)
    }

    async fn rows(&self, project: &str, table: &str, limit: usize, offset: usize) -> Result<Vec<Row>, ProviderError> {
        let file = self.read_table(project, table).await?;
        Ok(file.rows.into_iter().skip(offset).take(limit).collect())
    }
}
