//! Table scan executor.

use rivulet_core::Row;
use rivulet_storage::{Filter, TableState};
use std::sync::Arc;

/// Scans one table snapshot, keeping rows that satisfy a filter.
pub struct TableScanExecutor<'a> {
    state: &'a TableState,
    filter: &'a Filter,
}

impl<'a> TableScanExecutor<'a> {
    pub fn new(state: &'a TableState, filter: &'a Filter) -> Self {
        Self { state, filter }
    }

    /// Matching rows in ascending primary-key order.
    pub fn execute(&self) -> Vec<Arc<Row>> {
        self.state.select(self.filter)
    }
}
