//! Row storage for a single table.
//!
//! Rows are keyed by primary key in a `BTreeMap`, so scans always come out in
//! ascending key order. The map sits behind an `Arc` and is copied on write:
//! a `TableState` snapshot taken before a mutation keeps seeing the old rows.

use crate::constraint::ConstraintChecker;
use crate::error::{Result, StoreError};
use crate::filter::Filter;
use rivulet_core::schema::Table;
use rivulet_core::{Row, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

type RowMap = BTreeMap<Value, Arc<Row>>;

/// An immutable, cheaply cloneable view of one table at one revision.
#[derive(Clone, Debug, PartialEq)]
pub struct TableState {
    schema: Arc<Table>,
    revision: u64,
    rows: Arc<RowMap>,
}

impl TableState {
    pub fn schema(&self) -> &Arc<Table> {
        &self.schema
    }

    /// Number of committed mutations that touched this table.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<&Arc<Row>> {
        self.rows.get(key)
    }

    /// Iterates rows in ascending primary-key order.
    pub fn rows(&self) -> impl Iterator<Item = &Arc<Row>> {
        self.rows.values()
    }

    /// Rows matching the filter, in ascending primary-key order.
    pub fn select(&self, filter: &Filter) -> Vec<Arc<Row>> {
        select_rows(&self.rows, self.schema.primary_key_index(), filter)
    }
}

/// Row storage for a single table.
#[derive(Clone, Debug, PartialEq)]
pub struct RowStore {
    schema: Arc<Table>,
    rows: Arc<RowMap>,
    revision: u64,
}

impl RowStore {
    /// Creates an empty store for the given table schema.
    pub fn new(schema: Arc<Table>) -> Self {
        Self {
            schema,
            rows: Arc::new(RowMap::new()),
            revision: 0,
        }
    }

    /// Returns the table schema.
    pub fn schema(&self) -> &Arc<Table> {
        &self.schema
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Advances the revision. Called once per committed mutation.
    pub(crate) fn bump_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    /// Takes a snapshot of the current rows.
    pub fn snapshot(&self) -> TableState {
        TableState {
            schema: self.schema.clone(),
            revision: self.revision,
            rows: self.rows.clone(),
        }
    }

    /// Extracts the primary key of a row.
    pub fn key_of(&self, row: &Row) -> Value {
        row.get(self.schema.primary_key_index())
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Gets a row by primary key.
    pub fn get(&self, key: &Value) -> Option<Arc<Row>> {
        self.rows.get(key).cloned()
    }

    /// Checks if a primary key exists.
    pub fn pk_exists(&self, key: &Value) -> bool {
        self.rows.contains_key(key)
    }

    /// Returns an iterator over all rows in key order.
    pub fn scan(&self) -> impl Iterator<Item = &Arc<Row>> + '_ {
        self.rows.values()
    }

    /// Rows matching the filter, in ascending primary-key order.
    pub fn select(&self, filter: &Filter) -> Vec<Arc<Row>> {
        select_rows(&self.rows, self.schema.primary_key_index(), filter)
    }

    /// Inserts a row, returning the stored (type-normalized) row.
    pub fn insert(&mut self, row: Row) -> Result<Row> {
        let row = ConstraintChecker::conform(&self.schema, row)?;
        let key = self.key_of(&row);
        if self.rows.contains_key(&key) {
            return Err(StoreError::duplicate_key(self.schema.name(), key));
        }
        Arc::make_mut(&mut self.rows).insert(key, Arc::new(row.clone()));
        Ok(row)
    }

    /// Replaces the row stored under `key`, returning `(old, new)`.
    ///
    /// The new row may carry a different primary key, as long as it does not
    /// collide with another row.
    pub fn update(&mut self, key: &Value, new_row: Row) -> Result<(Row, Row)> {
        let new_row = ConstraintChecker::conform(&self.schema, new_row)?;
        if !self.rows.contains_key(key) {
            return Err(StoreError::not_found(self.schema.name(), key.clone()));
        }

        let new_key = self.key_of(&new_row);
        if &new_key != key && self.rows.contains_key(&new_key) {
            return Err(StoreError::duplicate_key(self.schema.name(), new_key));
        }

        let rows = Arc::make_mut(&mut self.rows);
        let old = match rows.remove(key) {
            Some(old) => old,
            None => return Err(StoreError::not_found(self.schema.name(), key.clone())),
        };
        rows.insert(new_key, Arc::new(new_row.clone()));
        Ok((Arc::unwrap_or_clone(old), new_row))
    }

    /// Deletes a row by primary key.
    pub fn delete(&mut self, key: &Value) -> Result<Row> {
        match Arc::make_mut(&mut self.rows).remove(key) {
            Some(row) => Ok(Arc::unwrap_or_clone(row)),
            None => Err(StoreError::not_found(self.schema.name(), key.clone())),
        }
    }

    /// Removes every row. The revision advances if anything was removed.
    pub fn clear(&mut self) {
        if !self.rows.is_empty() {
            self.rows = Arc::new(RowMap::new());
            self.revision += 1;
        }
    }
}

fn select_rows(rows: &RowMap, pk_column: usize, filter: &Filter) -> Vec<Arc<Row>> {
    if let Some(key) = filter.key_lookup(pk_column) {
        return rows
            .get(key)
            .filter(|row| filter.matches(row))
            .cloned()
            .into_iter()
            .collect();
    }
    rows.values().filter(|row| filter.matches(row)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Condition;
    use rivulet_core::schema::TableBuilder;
    use rivulet_core::{CompareOp, DataType};

    fn test_schema() -> Arc<Table> {
        Arc::new(
            TableBuilder::new("test")
                .unwrap()
                .add_column("id", DataType::Int)
                .unwrap()
                .add_column("value", DataType::Text)
                .unwrap()
                .add_primary_key("id")
                .unwrap()
                .build()
                .unwrap(),
        )
    }

    fn row(id: i64, value: &str) -> Row {
        Row::new(vec![Value::Int(id), Value::from(value)])
    }

    #[test]
    fn test_insert_and_get() {
        let mut store = RowStore::new(test_schema());
        store.insert(row(2, "b")).unwrap();
        store.insert(row(1, "a")).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(*store.get(&Value::Int(1)).unwrap(), row(1, "a"));
        let keys: Vec<_> = store.scan().map(|r| store.key_of(r)).collect();
        assert_eq!(keys, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_duplicate_key() {
        let mut store = RowStore::new(test_schema());
        store.insert(row(1, "a")).unwrap();
        let err = store.insert(row(1, "b")).unwrap_err();
        assert_eq!(err, StoreError::duplicate_key("test", Value::Int(1)));
        assert_eq!(*store.get(&Value::Int(1)).unwrap(), row(1, "a"));
    }

    #[test]
    fn test_update_rekey() {
        let mut store = RowStore::new(test_schema());
        store.insert(row(1, "a")).unwrap();
        store.insert(row(2, "b")).unwrap();

        let (old, new) = store.update(&Value::Int(1), row(3, "a")).unwrap();
        assert_eq!(old, row(1, "a"));
        assert_eq!(new, row(3, "a"));
        assert!(!store.pk_exists(&Value::Int(1)));
        assert!(store.pk_exists(&Value::Int(3)));

        let err = store.update(&Value::Int(3), row(2, "x")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_delete_missing() {
        let mut store = RowStore::new(test_schema());
        assert!(matches!(
            store.delete(&Value::Int(9)),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_snapshot_is_isolated() {
        let mut store = RowStore::new(test_schema());
        store.insert(row(1, "a")).unwrap();
        let snapshot = store.snapshot();

        store.insert(row(2, "b")).unwrap();
        store.delete(&Value::Int(1)).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(**snapshot.get(&Value::Int(1)).unwrap(), row(1, "a"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_select_uses_key_and_filter() {
        let mut store = RowStore::new(test_schema());
        for i in 1..=5 {
            store.insert(row(i, if i % 2 == 0 { "even" } else { "odd" })).unwrap();
        }

        let odd = Filter::new(vec![Condition::new(1, DataType::Text, CompareOp::Eq, Value::from("odd"))]);
        let ids: Vec<_> = store.select(&odd).iter().map(|r| r.get(0).cloned().unwrap()).collect();
        assert_eq!(ids, vec![Value::Int(1), Value::Int(3), Value::Int(5)]);

        let point = odd.clone().and(Condition::new(0, DataType::Int, CompareOp::Eq, Value::Int(2)));
        assert!(store.select(&point).is_empty());
    }

    #[test]
    fn test_clear_bumps_revision() {
        let mut store = RowStore::new(test_schema());
        store.clear();
        assert_eq!(store.revision(), 0);
        store.insert(row(1, "a")).unwrap();
        store.clear();
        assert_eq!(store.revision(), 1);
        assert!(store.is_empty());
    }
}
