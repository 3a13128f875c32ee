//! Column kinds and table schemas

use serde::{Deserialize, Serialize};

/// Semantic kind of a column, derived from its raw database type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Number,
    Date,
    Boolean,
    String,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Number => "number",
            ColumnKind::Date => "date",
            ColumnKind::Boolean => "boolean",
            ColumnKind::String => "string",
        }
    }

    /// Kinds that can partition rows into named groups.
    pub fn is_categorical(&self) -> bool {
        matches!(self, ColumnKind::String | ColumnKind::Boolean)
    }
}

/// Map a raw column type to its kind.
///
/// Case-insensitive substring match, checked in order: numeric markers first,
/// then temporal, then boolean. Everything else is a string. The order matters:
/// `"timestamp without time zone"` contains no numeric marker and resolves to
/// [`ColumnKind::Date`].
pub fn infer_kind(raw_type: &str) -> ColumnKind {
    let t = raw_type.to_lowercase();
    if ["int", "double", "float", "numeric"].iter().any(|m| t.contains(m)) {
        ColumnKind::Number
    } else if t.contains("date") || t.contains("time") {
        ColumnKind::Date
    } else if t.contains("bool") {
        ColumnKind::Boolean
    } else {
        ColumnKind::String
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSchema {
    pub name: String,
    pub raw_type: String,
    pub kind: ColumnKind,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, raw_type: impl Into<String>) -> Self {
        let raw_type = raw_type.into();
        let kind = infer_kind(&raw_type);
        Self {
            name: name.into(),
            raw_type,
            kind,
        }
    }
}

/// Resolved schema of one (project, table) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub project: String,
    pub table: String,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn new(project: impl Into<String>, table: impl Into<String>, columns: Vec<ColumnSchema>) -> Self {
        Self {
            project: project.into(),
            table: table.into(),
            columns,
        }
    }

    pub fn find_column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.find_column(name).map(|c| c.kind)
    }
}

/// Kind lookup over a bare column list.
pub fn kind_of(columns: &[ColumnSchema], name: &str) -> Option<ColumnKind> {
    columns.iter().find(|c| c.name == name).map(|c| c.kind)
}
