//! Project executor.

use crate::ast::Projection;
use crate::result::ResultSet;
use rivulet_core::schema::Table;
use rivulet_core::Row;
use std::sync::Arc;

/// Projects specific columns from rows, in schema-declared order.
pub struct ProjectExecutor {
    names: Vec<String>,
    /// Column indices to project; `None` keeps every column.
    column_indices: Option<Vec<usize>>,
}

impl ProjectExecutor {
    pub fn new(schema: &Table, projection: &Projection) -> Self {
        match projection {
            Projection::All => Self {
                names: schema.columns().iter().map(|c| c.name().to_string()).collect(),
                column_indices: None,
            },
            Projection::Columns(columns) => Self {
                names: columns.iter().map(|c| c.name.clone()).collect(),
                column_indices: Some(columns.iter().map(|c| c.index).collect()),
            },
        }
    }

    /// Column names of the output.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn execute(&self, rows: Vec<Arc<Row>>) -> ResultSet {
        let rows = rows
            .into_iter()
            .map(|row| match &self.column_indices {
                None => Arc::unwrap_or_clone(row),
                Some(indices) => row.project(indices),
            })
            .collect();
        ResultSet::new(self.names.clone(), rows)
    }
}
