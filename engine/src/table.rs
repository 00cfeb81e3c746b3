//! FILENAME: engine/src/table.rs
//! PURPOSE: The in-memory table handed between the core transforms.
//! CONTEXT: A `Table` is a list of named columns and a list of rows. Each
//! row remembers the index it had in the source table, so subsets produced
//! by filtering or deduplication keep their original row identity. Core
//! operations never mutate a table in place; they build a new one.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::value::Value;

/// One row of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Position of this row in the table it was originally loaded into.
    pub index: usize,
    pub values: Vec<Value>,
}

impl Row {
    pub fn get(&self, col: usize) -> &Value {
        self.values.get(col).unwrap_or(&Value::Empty)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Creates an empty table with the given column names.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Table {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Builds a table from existing rows, keeping their indices.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Table { columns, rows }
    }

    /// Appends a row. Its index is the current row count. Short rows are
    /// padded with `Empty`, long rows are truncated to the column count.
    pub fn push_row(&mut self, mut values: Vec<Value>) {
        values.resize(self.columns.len(), Value::Empty);
        let index = self.rows.len();
        self.rows.push(Row { index, values });
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Looks up a column position by name.
    pub fn column_index(&self, name: &str) -> EngineResult<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| EngineError::ColumnNotFound(name.to_string()))
    }

    /// Returns a new table holding the rows for which `keep` is true.
    pub fn select<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&Row) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Source indices of all rows, in order.
    pub fn row_indices(&self) -> Vec<usize> {
        self.rows.iter().map(|r| r.index).collect()
    }
}
