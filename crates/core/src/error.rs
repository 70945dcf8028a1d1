//! Error types for schema definition.

use thiserror::Error;

/// Result type alias for schema operations.
pub type Result<T> = core::result::Result<T, SchemaError>;

/// Errors raised while building or registering a table schema.
///
/// Schema errors are always fatal to the definition call that raised them:
/// nothing is registered when one is returned.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A table with this name is already registered with a different definition.
    #[error("table {name} is already defined with a different schema")]
    DuplicateTable { name: String },

    /// A column definition is invalid (unknown type, primary key misconfiguration,
    /// duplicate column name).
    #[error("invalid column {column} in table {table}: {reason}")]
    InvalidColumn {
        table: String,
        column: String,
        reason: String,
    },

    /// A table or column name does not follow identifier rules.
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },
}

impl SchemaError {
    /// Creates a duplicate table error.
    pub fn duplicate_table(name: impl Into<String>) -> Self {
        SchemaError::DuplicateTable { name: name.into() }
    }

    /// Creates an invalid column error.
    pub fn invalid_column(
        table: impl Into<String>,
        column: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        SchemaError::InvalidColumn {
            table: table.into(),
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid name error.
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SchemaError::duplicate_table("users");
        assert!(err.to_string().contains("users"));

        let err = SchemaError::invalid_column("users", "age", "unknown type varchar");
        let msg = err.to_string();
        assert!(msg.contains("age"));
        assert!(msg.contains("varchar"));
    }

    #[test]
    fn test_error_constructors() {
        match SchemaError::invalid_name("1abc", "must start with a letter") {
            SchemaError::InvalidName { name, .. } => assert_eq!(name, "1abc"),
            _ => panic!("Wrong error type"),
        }
    }
}
