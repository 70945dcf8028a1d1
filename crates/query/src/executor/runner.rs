//! Select execution against a data source.

use super::{ProjectExecutor, TableScanExecutor};
use crate::ast::{QueryDescriptor, SelectOp};
use crate::error::ExecError;
use crate::params::{resolve_filter, Params};
use crate::result::ResultSet;
use parking_lot::RwLock;
use rivulet_storage::{Filter, Store, TableState};

/// Anything that can hand out table snapshots.
pub trait DataSource {
    /// Returns a consistent snapshot of the table, if it exists.
    fn table_state(&self, table: &str) -> Option<TableState>;
}

impl DataSource for Store {
    fn table_state(&self, table: &str) -> Option<TableState> {
        self.read(table)
    }
}

impl DataSource for RwLock<Store> {
    fn table_state(&self, table: &str) -> Option<TableState> {
        self.read().read(table)
    }
}

impl<T: DataSource + ?Sized> DataSource for &T {
    fn table_state(&self, table: &str) -> Option<TableState> {
        (**self).table_state(table)
    }
}

impl<T: DataSource + ?Sized> DataSource for std::sync::Arc<T> {
    fn table_state(&self, table: &str) -> Option<TableState> {
        (**self).table_state(table)
    }
}

/// Executes a select descriptor with bound parameters.
///
/// Pure: the source is only read. Fails on unbound or ill-typed placeholders
/// instead of returning an empty result.
pub fn execute<S: DataSource + ?Sized>(
    descriptor: &QueryDescriptor,
    params: &Params,
    source: &S,
) -> Result<ResultSet, ExecError> {
    let select = descriptor.as_select().ok_or(ExecError::NotASelect {
        kind: descriptor.kind().name(),
    })?;
    params.check_complete(descriptor)?;
    let filter = resolve_filter(&select.predicate, params)?;
    let state = source
        .table_state(&select.table)
        .ok_or_else(|| ExecError::UnknownTable {
            table: select.table.clone(),
        })?;
    Ok(execute_resolved(select, &filter, &state))
}

/// Executes a select whose predicate is already resolved, against one snapshot.
pub fn execute_resolved(select: &SelectOp, filter: &Filter, state: &TableState) -> ResultSet {
    let rows = TableScanExecutor::new(state, filter).execute();
    ProjectExecutor::new(state.schema(), &select.projection).execute(rows)
}
