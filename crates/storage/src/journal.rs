//! Journal for tracking row changes within a mutation.
//!
//! Changes are applied to the `RowStore` eagerly; the journal remembers enough
//! to undo them in reverse order, and on commit becomes the list of
//! `RowChange`s reported to the caller.

use crate::mutation::RowChange;
use crate::row_store::RowStore;
use rivulet_core::{Row, Value};

/// A single journal entry representing a change.
#[derive(Clone, Debug, PartialEq)]
pub enum JournalEntry {
    /// A row was inserted under `key`.
    Insert { key: Value, row: Row },
    /// The row stored under `key` was replaced by `new`, which is stored under `new_key`.
    Update {
        key: Value,
        new_key: Value,
        old: Row,
        new: Row,
    },
    /// The row stored under `key` was deleted.
    Delete { key: Value, row: Row },
}

impl JournalEntry {
    /// Returns the primary key the row had before the change.
    pub fn key(&self) -> &Value {
        match self {
            JournalEntry::Insert { key, .. } => key,
            JournalEntry::Update { key, .. } => key,
            JournalEntry::Delete { key, .. } => key,
        }
    }

    fn into_change(self) -> RowChange {
        match self {
            JournalEntry::Insert { key, row } => RowChange::inserted(key, row),
            JournalEntry::Update { key, old, new, .. } => RowChange::updated(key, old, new),
            JournalEntry::Delete { key, row } => RowChange::deleted(key, row),
        }
    }
}

/// Journal for tracking changes within a single-table mutation.
#[derive(Debug, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    /// Creates a new empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_insert(&mut self, key: Value, row: Row) {
        self.entries.push(JournalEntry::Insert { key, row });
    }

    pub fn record_update(&mut self, key: Value, new_key: Value, old: Row, new: Row) {
        self.entries.push(JournalEntry::Update {
            key,
            new_key,
            old,
            new,
        });
    }

    pub fn record_delete(&mut self, key: Value, row: Row) {
        self.entries.push(JournalEntry::Delete { key, row });
    }

    /// Returns all journal entries.
    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Returns true if the journal is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Finalizes the journal into the ordered list of row changes.
    pub fn commit(self) -> Vec<RowChange> {
        self.entries.into_iter().map(JournalEntry::into_change).collect()
    }

    /// Undoes every recorded change, newest first.
    pub fn rollback(self, store: &mut RowStore) {
        for entry in self.entries.into_iter().rev() {
            // Each entry undoes a change that succeeded, so the inverse cannot conflict.
            let undone = match entry {
                JournalEntry::Insert { key, .. } => store.delete(&key).map(drop),
                JournalEntry::Update { new_key, old, .. } => store.update(&new_key, old).map(drop),
                JournalEntry::Delete { row, .. } => store.insert(row).map(drop),
            };
            debug_assert!(undone.is_ok(), "rollback conflicted: {undone:?}");
        }
    }
}
