//! Error types for the table store.

use rivulet_core::{DataType, Value};
use thiserror::Error;

/// Errors raised while applying a mutation to the store.
///
/// Any of these aborts the whole mutation; the store is left exactly as it was.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The named table has no storage.
    #[error("unknown table: {table}")]
    UnknownTable { table: String },

    /// A column position is outside the table's width.
    #[error("unknown column {column} in table {table}")]
    UnknownColumn { table: String, column: String },

    /// A row does not have one value per column.
    #[error("row for table {table} has {found} values, expected {expected}")]
    RowWidth {
        table: String,
        expected: usize,
        found: usize,
    },

    /// A value cannot be stored in its column.
    #[error("type mismatch on {table}.{column}: expected {expected}, found {found}")]
    TypeMismatch {
        table: String,
        column: String,
        expected: DataType,
        found: &'static str,
    },

    /// A null value was written to a non-nullable column.
    #[error("null value in non-nullable column {table}.{column}")]
    NullViolation { table: String, column: String },

    /// A row with this primary key already exists.
    #[error("duplicate primary key {key} in table {table}")]
    DuplicateKey { table: String, key: Value },

    /// No row has this primary key.
    #[error("no row with primary key {key} in table {table}")]
    NotFound { table: String, key: Value },
}

impl StoreError {
    pub fn unknown_table(table: impl Into<String>) -> Self {
        StoreError::UnknownTable {
            table: table.into(),
        }
    }

    pub fn duplicate_key(table: impl Into<String>, key: Value) -> Self {
        StoreError::DuplicateKey {
            table: table.into(),
            key,
        }
    }

    pub fn not_found(table: impl Into<String>, key: Value) -> Self {
        StoreError::NotFound {
            table: table.into(),
            key,
        }
    }
}

/// Errors raised while rebuilding a store from the event log.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplayError {
    /// Entries needed for the replay were discarded by compaction.
    #[error("event log compacted: first retained sequence is {first_retained}")]
    Compacted { first_retained: u64 },

    /// The requested sequence number was never assigned.
    #[error("sequence {requested} is beyond the last logged sequence {last}")]
    BeyondEnd { requested: u64, last: u64 },

    /// Re-applying an entry failed.
    #[error("replaying sequence {sequence} failed: {source}")]
    Apply {
        sequence: u64,
        #[source]
        source: StoreError,
    },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
