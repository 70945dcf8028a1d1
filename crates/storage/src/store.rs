//! The multi-table store.
//!
//! `Store` owns one `RowStore` per defined table and applies resolved
//! mutations atomically: every row of a mutation is applied, or none is.

use crate::error::{Result, StoreError};
use crate::filter::Filter;
use crate::mutation::{Assignment, MutationOp, MutationOutcome};
use crate::row_store::{RowStore, TableState};
use crate::transaction::Transaction;
use parking_lot::RwLock;
use rivulet_core::schema::Table;
use rivulet_core::{Row, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// A store shared between the mutation pipeline and readers.
pub type SharedStore = Arc<RwLock<Store>>;

/// Table name → row storage.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Store {
    tables: BTreeMap<String, RowStore>,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with an empty table for each schema.
    pub fn with_tables<'a>(schemas: impl IntoIterator<Item = &'a Arc<Table>>) -> Self {
        let mut store = Self::new();
        for schema in schemas {
            store.create_table(schema.clone());
        }
        store
    }

    /// Wraps the store for sharing.
    pub fn into_shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    /// Adds storage for a table. Existing storage for the same name is kept.
    pub fn create_table(&mut self, schema: Arc<Table>) {
        let name = schema.name().to_string();
        self.tables
            .entry(name)
            .or_insert_with(|| RowStore::new(schema));
    }

    /// Gets a reference to a table's storage.
    pub fn table(&self, name: &str) -> Option<&RowStore> {
        self.tables.get(name)
    }

    /// Returns true if the table has storage.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Returns all table names.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(|s| s.as_str()).collect()
    }

    /// Returns the total row count across all tables.
    pub fn total_row_count(&self) -> usize {
        self.tables.values().map(|t| t.len()).sum()
    }

    /// Takes a consistent snapshot of one table.
    pub fn read(&self, table: &str) -> Option<TableState> {
        self.tables.get(table).map(RowStore::snapshot)
    }

    /// Current revision of a table.
    pub fn revision(&self, table: &str) -> Option<u64> {
        self.tables.get(table).map(RowStore::revision)
    }

    /// Applies a mutation atomically.
    ///
    /// On success the table revision has advanced by one if at least one row
    /// was touched. On error nothing changed.
    pub fn apply(&mut self, table: &str, op: MutationOp) -> Result<MutationOutcome> {
        let store = self
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::unknown_table(table))?;
        let kind = op.kind();

        let (changes, revision) = Transaction::run(store, |tx| match op {
            MutationOp::Insert { rows } => rows.into_iter().try_for_each(|row| tx.insert(row)),
            MutationOp::Update {
                filter,
                assignments,
            } => update_matching(tx, &filter, &assignments),
            MutationOp::Delete { filter } => {
                let keys = matching_keys(tx.store(), &filter);
                keys.iter().try_for_each(|key| tx.delete(key))
            }
            MutationOp::Replace { rows } => rows
                .into_iter()
                .try_for_each(|(key, row)| tx.update(&key, row)),
            MutationOp::DeleteByKey { keys } => keys.iter().try_for_each(|key| tx.delete(key)),
        })?;

        debug!(table, %kind, affected = changes.len(), revision, "applied mutation");
        Ok(MutationOutcome {
            table: table.to_string(),
            kind,
            changes,
            revision,
        })
    }

    /// Removes every row from every table.
    pub fn clear(&mut self) {
        for store in self.tables.values_mut() {
            store.clear();
        }
    }
}

fn matching_keys(store: &RowStore, filter: &Filter) -> Vec<Value> {
    store
        .select(filter)
        .iter()
        .map(|row| store.key_of(row))
        .collect()
}

fn update_matching(
    tx: &mut Transaction<'_>,
    filter: &Filter,
    assignments: &[Assignment],
) -> Result<()> {
    let schema = tx.store().schema().clone();
    if let Some(bad) = assignments.iter().find(|a| a.column >= schema.width()) {
        return Err(StoreError::UnknownColumn {
            table: schema.name().to_string(),
            column: format!("#{}", bad.column),
        });
    }

    let targets: Vec<(Value, Row)> = tx
        .store()
        .select(filter)
        .into_iter()
        .map(|row| {
            let key = tx.store().key_of(&row);
            let mut updated = Arc::unwrap_or_clone(row);
            for assignment in assignments {
                updated.set(assignment.column, assignment.value.clone());
            }
            (key, updated)
        })
        .collect();

    for (key, row) in targets {
        tx.update(&key, row)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Condition;
    use crate::mutation::{MutationKind, RowChange};
    use rivulet_core::schema::TableBuilder;
    use rivulet_core::{CompareOp, DataType};

    fn users() -> Arc<Table> {
        Arc::new(
            TableBuilder::new("users")
                .unwrap()
                .add_column("user_id", DataType::Int)
                .unwrap()
                .add_column("name", DataType::Text)
                .unwrap()
                .add_column("age", DataType::Int)
                .unwrap()
                .add_nullable(&["age"])
                .add_primary_key("user_id")
                .unwrap()
                .build()
                .unwrap(),
        )
    }

    fn user(id: i64, name: &str, age: Option<i64>) -> Row {
        Row::new(vec![Value::Int(id), Value::from(name), Value::from(age)])
    }

    fn seeded() -> Store {
        let mut store = Store::with_tables([&users()]);
        store
            .apply(
                "users",
                MutationOp::Insert {
                    rows: vec![
                        user(1, "ann", Some(30)),
                        user(2, "bob", Some(17)),
                        user(3, "cat", None),
                    ],
                },
            )
            .unwrap();
        store
    }

    fn age_at_least(age: i64) -> Filter {
        Filter::new(vec![Condition::new(2, DataType::Int, CompareOp::Ge, Value::Int(age))])
    }

    #[test]
    fn test_insert_outcome() {
        let store = seeded();
        let state = store.read("users").unwrap();
        assert_eq!(state.len(), 3);
        assert_eq!(state.revision(), 1);
        assert!(store.read("orders").is_none());
    }

    #[test]
    fn test_unknown_table() {
        let mut store = seeded();
        let err = store
            .apply("orders", MutationOp::Delete { filter: Filter::all() })
            .unwrap_err();
        assert_eq!(err, StoreError::unknown_table("orders"));
    }

    #[test]
    fn test_update_counts_matched_rows() {
        let mut store = seeded();
        let outcome = store
            .apply(
                "users",
                MutationOp::Update {
                    filter: age_at_least(18),
                    assignments: vec![Assignment::new(1, Value::from("ann"))],
                },
            )
            .unwrap();
        // the row already had that name, it still counts
        assert_eq!(outcome.kind, MutationKind::Update);
        assert_eq!(outcome.affected(), 1);
        assert_eq!(outcome.revision, 2);
    }

    #[test]
    fn test_update_without_filter_touches_all() {
        let mut store = seeded();
        let outcome = store
            .apply(
                "users",
                MutationOp::Update {
                    filter: Filter::all(),
                    assignments: vec![Assignment::new(2, Value::Int(40))],
                },
            )
            .unwrap();
        assert_eq!(outcome.affected(), 3);
        let state = store.read("users").unwrap();
        assert!(state.rows().all(|r| r.get(2) == Some(&Value::Int(40))));
    }

    #[test]
    fn test_delete_records_before_images() {
        let mut store = seeded();
        let outcome = store
            .apply("users", MutationOp::Delete { filter: age_at_least(18) })
            .unwrap();
        assert_eq!(
            outcome.changes,
            vec![RowChange::deleted(Value::Int(1), user(1, "ann", Some(30)))]
        );
        assert_eq!(store.read("users").unwrap().len(), 2);
    }

    #[test]
    fn test_zero_rows_keeps_revision() {
        let mut store = seeded();
        let outcome = store
            .apply("users", MutationOp::Delete { filter: age_at_least(99) })
            .unwrap();
        assert!(outcome.is_empty());
        assert_eq!(outcome.revision, 1);
        assert_eq!(store.revision("users"), Some(1));
    }

    #[test]
    fn test_batch_insert_is_atomic() {
        let mut store = seeded();
        let before = store.clone();
        let err = store
            .apply(
                "users",
                MutationOp::Insert {
                    rows: vec![user(4, "dan", None), user(1, "dup", None)],
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
        assert_eq!(store, before);
    }

    #[test]
    fn test_update_null_violation_is_atomic() {
        let mut store = seeded();
        let before = store.clone();
        let err = store
            .apply(
                "users",
                MutationOp::Update {
                    filter: Filter::all(),
                    assignments: vec![Assignment::new(1, Value::Null)],
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::NullViolation { .. }));
        assert_eq!(store, before);
    }

    #[test]
    fn test_update_primary_key_collision() {
        let mut store = seeded();
        let err = store
            .apply(
                "users",
                MutationOp::Update {
                    filter: Filter::all(),
                    assignments: vec![Assignment::new(0, Value::Int(9))],
                },
            )
            .unwrap_err();
        assert_eq!(err, StoreError::duplicate_key("users", Value::Int(9)));
    }

    #[test]
    fn test_snapshot_survives_mutation() {
        let mut store = seeded();
        let snapshot = store.read("users").unwrap();
        store
            .apply("users", MutationOp::Delete { filter: Filter::all() })
            .unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(store.read("users").unwrap().len(), 0);
    }
}
