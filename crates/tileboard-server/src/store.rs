//! Saved dashboard documents, keyed by program
//!
//! Documents are kept exactly as submitted (plus identity fields) so that
//! older shapes stay readable; every read normalizes through
//! [`Visualization::from_document`]. With a storage directory configured each
//! document is also written to `<dir>/<program>/<id>.json` and reloaded at
//! startup.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tileboard_ir::{DocumentError, Visualization};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::provider::{check_name, ProviderError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Visualization not found: {program}/{id}")]
    NotFound { program: String, id: String },

    #[error("Dashboard name is required.")]
    MissingName,

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    InvalidName(#[from] ProviderError),

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Body of a create request. `document` is accepted as an alias of `config`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewVisualization {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(alias = "document", default)]
    pub config: Value,
}

pub struct DocumentStore {
    dir: Option<PathBuf>,
    docs: RwLock<HashMap<String, Vec<Value>>>,
}

impl DocumentStore {
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            docs: RwLock::new(HashMap::new()),
        }
    }

    /// Disk-backed store; existing documents under `dir` are loaded.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        let docs = load_dir(&dir).await?;
        info!(
            dir = %dir.display(),
            programs = docs.len(),
            documents = docs.values().map(Vec::len).sum::<usize>(),
            "loaded saved visualizations"
        );
        Ok(Self {
            dir: Some(dir),
            docs: RwLock::new(docs),
        })
    }

    /// Validate and store a new document; returns it normalized.
    pub async fn create(&self, program: &str, request: NewVisualization) -> Result<Visualization, StoreError> {
        check_name(program)?;
        let name = request.name.trim();
        if name.is_empty() {
            return Err(StoreError::MissingName);
        }

        let mut doc: Map<String, Value> = match request.config {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            _ => return Err(DocumentError::NotAnObject.into()),
        };
        let id = Uuid::new_v4().to_string();
        doc.insert("id".to_string(), Value::from(id.as_str()));
        doc.insert("programId".to_string(), Value::from(program));
        doc.insert("name".to_string(), Value::from(name));
        match request.description.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(d) => doc.insert("description".to_string(), Value::from(d)),
            None => doc.remove("description"),
        };
        doc.insert("createdAt".to_string(), Value::from(Utc::now().to_rfc3339()));

        let doc = Value::Object(doc);
        let vis = Visualization::from_document(doc.clone())?;

        if let Some(dir) = &self.dir {
            let program_dir = dir.join(program);
            tokio::fs::create_dir_all(&program_dir).await?;
            tokio::fs::write(program_dir.join(format!("{id}.json")), serde_json::to_vec_pretty(&doc)?).await?;
        }
        self.docs.write().await.entry(program.to_string()).or_default().push(doc);
        Ok(vis)
    }

    /// Normalized documents of a program, newest first. Unreadable documents are skipped.
    pub async fn list(&self, program: &str) -> Vec<Visualization> {
        let docs = self.docs.read().await;
        let mut out: Vec<Visualization> = docs
            .get(program)
            .into_iter()
            .flatten()
            .filter_map(|doc| match Visualization::from_document(doc.clone()) {
                Ok(vis) => Some(vis),
                Err(e) => {
                    warn!(program, error = %e, "skipping unreadable visualization");
                    None
                }
            })
            .collect();
        out.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
        out
    }

    pub async fn get(&self, program: &str, id: &str) -> Result<Visualization, StoreError> {
        let docs = self.docs.read().await;
        let doc = docs
            .get(program)
            .and_then(|list| list.iter().find(|d| d.get("id").and_then(Value::as_str) == Some(id)))
            .ok_or_else(|| StoreError::NotFound {
                program: program.to_string(),
                id: id.to_string(),
            })?;
        Ok(Visualization::from_document(doc.clone())?)
    }
}

fn created_at(vis: &Visualization) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&vis.created_at)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

async fn load_dir(dir: &Path) -> Result<HashMap<String, Vec<Value>>, StoreError> {
    let mut docs: HashMap<String, Vec<Value>> = HashMap::new();
    let mut programs = tokio::fs::read_dir(dir).await?;
    while let Some(program) = programs.next_entry().await? {
        if !program.file_type().await?.is_dir() {
            continue;
        }
        let name = program.file_name().to_string_lossy().into_owned();
        let mut files = tokio::fs::read_dir(program.path()).await?;
        while let Some(file) = files.next_entry().await? {
            let path = file.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = tokio::fs::read(&path).await?;
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(doc) => docs.entry(name.clone()).or_default().push(doc),
                Err(e) => warn!(path = %path.display(), error = %e, "ignoring malformed document"),
            }
        }
    }
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(name: &str, config: Value) -> NewVisualization {
        NewVisualization {
            name: name.to_string(),
            description: Some("  ".to_string()),
            config,
        }
    }

    fn bar_config() -> Value {
        json!({
            "widgets": [{
                "id": "w1", "title": "Counts", "table": "sightings", "chartType": "bar",
                "xField": "species", "yField": "count"
            }]
        })
    }

    #[tokio::test]
    async fn test_create_normalizes() {
        let store = DocumentStore::in_memory();
        let vis = store.create("prog-1", request(" Wetlands ", bar_config())).await.unwrap();
        assert_eq!(vis.name, "Wetlands");
        assert_eq!(vis.description, None);
        assert_eq!(vis.program_id.as_deref(), Some("prog-1"));
        assert_eq!(vis.widgets[0].metrics[0].field, "count");
        assert!(vis.global_filters.is_empty());

        let fetched = store.get("prog-1", &vis.id).await.unwrap();
        assert_eq!(fetched.fingerprint(), vis.fingerprint());
        assert!(matches!(store.get("prog-2", &vis.id).await, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let store = DocumentStore::in_memory();
        assert!(matches!(
            store.create("p", request("", bar_config())).await,
            Err(StoreError::MissingName)
        ));
        assert!(matches!(
            store.create("p", request("x", json!([1, 2]))).await,
            Err(StoreError::Document(DocumentError::NotAnObject))
        ));
        let dup = json!({"widgets": [
            {"id": "w", "title": "a", "table": "t", "chartType": "note"},
            {"id": "w", "title": "b", "table": "t", "chartType": "note"}
        ]});
        assert!(matches!(
            store.create("p", request("x", dup)).await,
            Err(StoreError::Document(DocumentError::DuplicateWidgetId(_)))
        ));
        assert!(matches!(
            store.create("../p", request("x", bar_config())).await,
            Err(StoreError::InvalidName(_))
        ));
        assert!(store.list("p").await.is_empty());
    }

    #[tokio::test]
    async fn test_disk_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let first_id = {
            let store = DocumentStore::open(dir.path()).await.unwrap();
            let first = store.create("prog", request("First", bar_config())).await.unwrap();
            store.create("prog", request("Second", Value::Null)).await.unwrap();
            first.id
        };
        std::fs::write(dir.path().join("prog").join("broken.json"), "{not json").unwrap();

        let reopened = DocumentStore::open(dir.path()).await.unwrap();
        let listed = reopened.list("prog").await;
        assert_eq!(listed.len(), 2);
        assert_eq!(reopened.get("prog", &first_id).await.unwrap().name, "First");
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = DocumentStore::in_memory();
        {
            let mut docs = store.docs.write().await;
            let list = docs.entry("p".to_string()).or_default();
            for (id, at) in [("old", "2024-01-01T00:00:00Z"), ("new", "2024-03-01T00:00:00+02:00"), ("mid", "2024-02-01T00:00:00Z")] {
                list.push(json!({"id": id, "name": id, "createdAt": at, "widgets": [], "globalFilters": []}));
            }
        }
        let ids: Vec<String> = store.list("p").await.into_iter().map(|v| v.id).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }
}
