//! Query result sets.

use rivulet_core::{Row, Value};
use serde::Serialize;
use std::collections::BTreeMap;

/// Rows produced by a select, with their column names.
///
/// Row order is ascending primary key, which keeps it stable for an unchanged
/// table. Equality for change detection is order-insensitive, see `same_rows`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// An empty result with the given columns.
    pub fn empty(columns: Vec<String>) -> Self {
        Self::new(columns, Vec::new())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Looks up a cell by row position and column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(index)
    }

    /// True if both results hold the same multiset of rows under the same columns.
    pub fn same_rows(&self, other: &ResultSet) -> bool {
        if self.columns != other.columns || self.rows.len() != other.rows.len() {
            return false;
        }
        if self.rows == other.rows {
            return true;
        }
        let mut left: Vec<&Row> = self.rows.iter().collect();
        let mut right: Vec<&Row> = other.rows.iter().collect();
        left.sort_unstable();
        right.sort_unstable();
        left == right
    }

    /// Converts each row to a column name → value map.
    pub fn to_maps(&self) -> Vec<BTreeMap<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.values().iter().cloned())
                    .collect()
            })
            .collect()
    }
}
