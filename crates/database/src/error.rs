//! Error types for the database facade and the mutation pipeline.

use rivulet_core::{DataType, SchemaError};
use rivulet_query::{ExecError, ParseError};
use rivulet_storage::{ReplayError, StoreError};
use thiserror::Error;

/// Errors from running an insert, update or delete.
///
/// A failed mutation leaves the store untouched, appends nothing to the event
/// log and notifies no subscriber.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("missing binding for placeholder :{name}")]
    MissingBinding { name: String },

    #[error("placeholder :{placeholder} bound to {found}, but {column} is {expected}")]
    TypeMismatch {
        placeholder: String,
        column: String,
        expected: DataType,
        found: &'static str,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("expected an insert, update or delete, got {kind}")]
    NotAMutation { kind: &'static str },

    /// Issued from a listener while this database was committing.
    #[error("mutation issued while another mutation is being committed")]
    Reentrant,
}

impl From<ExecError> for MutationError {
    fn from(err: ExecError) -> Self {
        match err {
            ExecError::MissingBinding { name } => MutationError::MissingBinding { name },
            ExecError::TypeMismatch {
                placeholder,
                column,
                expected,
                found,
            } => MutationError::TypeMismatch {
                placeholder,
                column,
                expected,
                found,
            },
            ExecError::NotASelect { kind } | ExecError::NotAMutation { kind } => {
                MutationError::NotAMutation { kind }
            }
            ExecError::UnknownTable { table } => StoreError::unknown_table(table).into(),
        }
    }
}

/// Errors from registering effect adapters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EffectError {
    #[error("hook registration requires a running tokio runtime")]
    NoRuntime,

    #[error(transparent)]
    Replay(#[from] ReplayError),
}

/// Errors surfaced by the `Database` facade.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error(transparent)]
    Effect(#[from] EffectError),

    #[error(transparent)]
    Replay(#[from] ReplayError),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type alias for facade operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;
