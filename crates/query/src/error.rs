//! Error types for compiling and executing queries.

use rivulet_core::DataType;
use thiserror::Error;

/// Errors raised while compiling a query string into a descriptor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Malformed syntax. `position` is the byte offset of the offending token.
    #[error("syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    /// Name resolution errors carry the byte offset of the name as written.
    #[error("unknown table {table} at position {position}")]
    UnknownTable { table: String, position: usize },

    #[error("unknown column {column} in table {table} at position {position}")]
    UnknownColumn {
        table: String,
        column: String,
        position: usize,
    },

    /// A literal that cannot be stored in the column it is compared with or assigned to.
    #[error("literal {literal} cannot be used with {table}.{column} of type {expected}")]
    LiteralType {
        table: String,
        column: String,
        expected: DataType,
        literal: String,
    },

    /// A column listed twice in a projection, column list or set clause.
    #[error("column {column} at position {position} is listed more than once")]
    DuplicateColumn { column: String, position: usize },
}

impl ParseError {
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        ParseError::Syntax {
            position,
            message: message.into(),
        }
    }
}

/// Errors raised while binding parameters or executing a descriptor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecError {
    /// A referenced placeholder has no bound value.
    #[error("missing binding for placeholder :{name}")]
    MissingBinding { name: String },

    /// A bound value cannot be used with the column its placeholder fills.
    #[error("placeholder :{placeholder} bound to {found}, but {column} is {expected}")]
    TypeMismatch {
        placeholder: String,
        column: String,
        expected: DataType,
        found: &'static str,
    },

    /// A mutation descriptor was handed to the query surface.
    #[error("expected a select, got {kind}")]
    NotASelect { kind: &'static str },

    /// A select descriptor was handed to the mutation surface.
    #[error("expected an insert, update or delete, got {kind}")]
    NotAMutation { kind: &'static str },

    /// The data source has no such table.
    #[error("unknown table: {table}")]
    UnknownTable { table: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = ParseError::syntax(7, "expected 'from'");
        assert_eq!(err.to_string(), "syntax error at position 7: expected 'from'");

        let err = ExecError::MissingBinding { name: "id".into() };
        assert_eq!(err.to_string(), "missing binding for placeholder :id");

        let err = ExecError::TypeMismatch {
            placeholder: "id".into(),
            column: "user_id".into(),
            expected: DataType::Int,
            found: "text",
        };
        assert_eq!(err.to_string(), "placeholder :id bound to text, but user_id is int");
    }
}
