//! Mutation operations and their outcomes.

use crate::filter::Filter;
use rivulet_core::{Row, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three kinds of state change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
}

impl MutationKind {
    pub fn name(&self) -> &'static str {
        match self {
            MutationKind::Insert => "insert",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `column = value` in an update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub column: usize,
    pub value: Value,
}

impl Assignment {
    pub fn new(column: usize, value: Value) -> Self {
        Self { column, value }
    }
}

/// A fully resolved mutation against one table.
#[derive(Clone, Debug, PartialEq)]
pub enum MutationOp {
    /// Inserts full-width rows.
    Insert { rows: Vec<Row> },
    /// Applies assignments to every row matching the filter.
    Update {
        filter: Filter,
        assignments: Vec<Assignment>,
    },
    /// Removes every row matching the filter.
    Delete { filter: Filter },
    /// Replaces rows addressed by their current primary key.
    Replace { rows: Vec<(Value, Row)> },
    /// Removes rows addressed by primary key.
    DeleteByKey { keys: Vec<Value> },
}

impl MutationOp {
    pub fn kind(&self) -> MutationKind {
        match self {
            MutationOp::Insert { .. } => MutationKind::Insert,
            MutationOp::Update { .. } | MutationOp::Replace { .. } => MutationKind::Update,
            MutationOp::Delete { .. } | MutationOp::DeleteByKey { .. } => MutationKind::Delete,
        }
    }
}

/// The before/after images of one row touched by a mutation.
///
/// `key` is the primary key the row had before the mutation (for inserts, the
/// new key). Inserts have no `before`, deletes have no `after`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowChange {
    pub key: Value,
    pub before: Option<Row>,
    pub after: Option<Row>,
}

impl RowChange {
    pub fn inserted(key: Value, row: Row) -> Self {
        Self {
            key,
            before: None,
            after: Some(row),
        }
    }

    pub fn updated(key: Value, before: Row, after: Row) -> Self {
        Self {
            key,
            before: Some(before),
            after: Some(after),
        }
    }

    pub fn deleted(key: Value, row: Row) -> Self {
        Self {
            key,
            before: Some(row),
            after: None,
        }
    }

    /// Iterates the row images that exist for this change.
    pub fn images(&self) -> impl Iterator<Item = &Row> {
        self.before.iter().chain(self.after.iter())
    }
}

/// What a committed mutation did.
#[derive(Clone, Debug, PartialEq)]
pub struct MutationOutcome {
    pub table: String,
    pub kind: MutationKind,
    /// Touched rows, in application order.
    pub changes: Vec<RowChange>,
    /// Table revision after the mutation.
    pub revision: u64,
}

impl MutationOutcome {
    /// Number of rows inserted, matched or removed.
    pub fn affected(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Primary keys of the touched rows, in application order.
    pub fn affected_keys(&self) -> Vec<Value> {
        self.changes.iter().map(|c| c.key.clone()).collect()
    }
}
