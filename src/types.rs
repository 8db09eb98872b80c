//! Core data model shared by the index, predicate, and planner layers.

use serde::{Deserialize, Serialize};

/// Opaque row identifier, unique within a table.
///
/// Order carries no meaning beyond uniqueness; callers must not rely on
/// RowId ordering to reflect insertion order of business data.
pub type RowId = u64;

/// The declared type of a column's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataKind {
    Int32,
    Int64,
    Float32,
    Float64,
    Boolean,
    String,
}

/// A single column definition: name plus declared kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub kind: DataKind,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, kind: DataKind) -> Self {
        Self { name: name.into(), kind }
    }
}

/// An ordered sequence of column definitions.
///
/// The core resolves columns by name to a position; it never inspects
/// `kind` itself (index keys are always strings — see `CompositeKey`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<ColumnDef>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, i: usize) -> Option<&ColumnDef> {
        self.columns.get(i)
    }

    /// Resolves a column name to its position in the schema.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }
}

/// A row as it reaches the index layer: one string per schema column, in
/// schema order. The row store is responsible for this projection; the
/// core never sees richer row representations.
pub type RowValues = Vec<String>;
