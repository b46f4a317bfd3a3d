//! Tabular containers: rows, lists, and column-named datasets.

use serde::Serialize;
use std::fmt;

use super::Value;

/// Name of the vertex-id column in storage responses.
pub const COL_VID: &str = "_vid";
/// Name of the per-row statistics column in neighbor responses.
pub const COL_STATS: &str = "_stats";
/// Name of the trailing expression column in neighbor responses.
pub const COL_EXPR: &str = "_expr";
/// Reserved edge-key column names.
pub const COL_SRC: &str = "_src";
pub const COL_DST: &str = "_dst";
pub const COL_TYPE: &str = "_type";
pub const COL_RANK: &str = "_rank";
/// Column-name prefixes in neighbor response headers.
pub const TAG_COL_PREFIX: &str = "_tag:";
pub const EDGE_COL_PREFIX: &str = "_edge:";

/// An ordered sequence of values. Immutable once stored in a result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Row {
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Row {
        Row { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Row {
        Row { values }
    }
}

/// An ordered collection of values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct List {
    pub values: Vec<Value>,
}

impl List {
    pub fn new(values: Vec<Value>) -> List {
        List { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<Value>> for List {
    fn from(values: Vec<Value>) -> List {
        List { values }
    }
}

/// A column-named table of rows of matching arity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct DataSet {
    pub col_names: Vec<String>,
    pub rows: Vec<Row>,
}

impl DataSet {
    /// New empty dataset with the given header.
    pub fn new(col_names: impl IntoIterator<Item = impl Into<String>>) -> DataSet {
        DataSet {
            col_names: col_names.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn col_size(&self) -> usize {
        self.col_names.len()
    }

    pub fn row_size(&self) -> usize {
        self.rows.len()
    }

    pub fn push(&mut self, row: Row) {
        debug_assert_eq!(row.len(), self.col_names.len());
        self.rows.push(row);
    }

    pub fn memory_usage(&self) -> usize {
        let header: usize = self.col_names.iter().map(String::len).sum();
        let body: usize = self
            .rows
            .iter()
            .flat_map(|r| r.values.iter())
            .map(Value::memory_usage)
            .sum();
        header + body
    }
}

impl fmt::Display for DataSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "| {} |", self.col_names.join(" | "))?;
        for row in &self.rows {
            let cells: Vec<String> = row.values.iter().map(|v| v.to_string()).collect();
            writeln!(f, "| {} |", cells.join(" | "))?;
        }
        Ok(())
    }
}
