// View column metadata used to check widget configurations
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Temporal,
    Text,
    Boolean,
}

impl ColumnKind {
    /// Text and boolean columns can both be grouped on directly.
    pub fn is_categorical(&self) -> bool {
        matches!(self, ColumnKind::Text | ColumnKind::Boolean)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnKind,
}

impl ColumnInfo {
    pub fn new(name: &str, kind: ColumnKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

/// Lookup of a view's columns by name.
#[derive(Debug, Clone, Copy)]
pub struct ViewSchema<'a> {
    columns: &'a [ColumnInfo],
}

impl<'a> ViewSchema<'a> {
    pub fn new(columns: &'a [ColumnInfo]) -> Self {
        Self { columns }
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.kind)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kind_of(name).is_some()
    }
}
