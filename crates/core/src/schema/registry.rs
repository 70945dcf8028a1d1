//! Schema registry.
//!
//! The registry is an explicitly constructed context object (usually shared behind
//! an `Arc`) holding every table definition known to a store. Tables are
//! write-once: after a table is defined its schema is frozen until `reset`.

use super::spec::TableSpec;
use super::table::Table;
use crate::error::{Result, SchemaError};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Registry of table schemas, keyed by table name.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    tables: RwLock<BTreeMap<String, Arc<Table>>>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table schema.
    ///
    /// Defining a table again with an identical schema is accepted and returns the
    /// already registered definition; a conflicting definition is rejected.
    pub fn define(&self, table: Table) -> Result<Arc<Table>> {
        let mut tables = self.tables.write();
        if let Some(existing) = tables.get(table.name()) {
            if **existing == table {
                return Ok(existing.clone());
            }
            return Err(SchemaError::duplicate_table(table.name()));
        }
        debug!(table = table.name(), columns = table.width(), "defined table");
        let table = Arc::new(table);
        tables.insert(table.name().to_string(), table.clone());
        Ok(table)
    }

    /// Builds and registers a table from a declarative spec.
    pub fn define_spec(&self, spec: &TableSpec) -> Result<Arc<Table>> {
        self.define(Table::from_spec(spec)?)
    }

    /// Looks up a table by name.
    pub fn lookup(&self, name: &str) -> Option<Arc<Table>> {
        self.tables.read().get(name).cloned()
    }

    /// Returns true if the table is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.tables.read().contains_key(name)
    }

    /// Returns all defined tables in name order.
    pub fn tables(&self) -> Vec<Arc<Table>> {
        self.tables.read().values().cloned().collect()
    }

    /// Returns the number of defined tables.
    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    /// Returns true if no table is defined.
    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }

    /// Forgets every table. Intended for test isolation.
    pub fn reset(&self) {
        self.tables.write().clear();
    }
}
