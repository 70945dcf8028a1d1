//! Table definition for Rivulet schemas.

use super::column::Column;
use super::spec::TableSpec;
use crate::error::{Result, SchemaError};
use crate::types::DataType;
use serde::{Deserialize, Serialize};

/// A table definition. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    name: String,
    /// Column definitions, in declaration order.
    columns: Vec<Column>,
    /// Position of the primary-key column.
    primary_key: usize,
}

impl Table {
    /// Builds a table from a declarative spec.
    pub fn from_spec(spec: &TableSpec) -> Result<Table> {
        let mut builder = TableBuilder::new(&spec.name)?;
        for col in &spec.columns {
            let data_type: DataType = col.type_name.parse().map_err(|_| {
                SchemaError::invalid_column(
                    &spec.name,
                    &col.name,
                    format!("unrecognized type {:?}", col.type_name),
                )
            })?;
            builder = builder.add_column(&col.name, data_type)?;
            if col.nullable {
                builder = builder.add_nullable(&[col.name.as_str()]);
            }
            if col.primary_key {
                builder = builder.add_primary_key(&col.name)?;
            }
        }
        builder.build()
    }

    /// Returns the table name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the columns.
    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the number of columns.
    #[inline]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Gets a column by name.
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Gets a column index by name.
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Returns the primary-key column position.
    #[inline]
    pub fn primary_key_index(&self) -> usize {
        self.primary_key
    }

    /// Returns the primary-key column.
    pub fn primary_key(&self) -> &Column {
        &self.columns[self.primary_key]
    }
}

/// Builder for creating table definitions.
pub struct TableBuilder {
    name: String,
    columns: Vec<Column>,
    pk_columns: Vec<String>,
}

impl TableBuilder {
    /// Creates a new table builder.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        check_naming_rules(&name)?;
        Ok(Self {
            name,
            columns: Vec::new(),
            pk_columns: Vec::new(),
        })
    }

    /// Adds a non-nullable column to the table.
    pub fn add_column(mut self, name: impl Into<String>, data_type: DataType) -> Result<Self> {
        let name = name.into();
        check_naming_rules(&name)?;
        if self.columns.iter().any(|c| c.name() == name) {
            return Err(SchemaError::invalid_column(
                &self.name,
                name,
                "column already exists",
            ));
        }
        self.columns.push(Column::new(name, data_type));
        Ok(self)
    }

    /// Marks existing columns as nullable.
    pub fn add_nullable(mut self, columns: &[&str]) -> Self {
        for name in columns {
            if let Some(col) = self.columns.iter_mut().find(|c| c.name() == *name) {
                *col = col.clone().nullable(true);
            }
        }
        self
    }

    /// Marks an existing column as the primary key.
    pub fn add_primary_key(mut self, column: &str) -> Result<Self> {
        if !self.columns.iter().any(|c| c.name() == column) {
            return Err(SchemaError::invalid_column(
                &self.name,
                column,
                "primary key refers to an unknown column",
            ));
        }
        self.pk_columns.push(column.to_string());
        Ok(self)
    }

    /// Builds the table definition.
    pub fn build(self) -> Result<Table> {
        let pk_name = match self.pk_columns.as_slice() {
            [single] => single.clone(),
            [] => {
                return Err(SchemaError::invalid_column(
                    &self.name,
                    "",
                    "no column is marked as primary key",
                ))
            }
            [_, second, ..] => {
                return Err(SchemaError::invalid_column(
                    &self.name,
                    second,
                    "more than one column is marked as primary key",
                ))
            }
        };

        let mut primary_key = 0;
        let mut columns = Vec::with_capacity(self.columns.len());
        for (i, col) in self.columns.into_iter().enumerate() {
            let is_pk = col.name() == pk_name;
            if is_pk {
                if col.is_nullable() {
                    return Err(SchemaError::invalid_column(
                        &self.name,
                        col.name(),
                        "primary key cannot be nullable",
                    ));
                }
                primary_key = i;
            }
            columns.push(col.primary_key(is_pk).with_index(i));
        }

        Ok(Table {
            name: self.name,
            columns,
            primary_key,
        })
    }
}

/// Words the query language reads as keywords, in any case.
const RESERVED: [&str; 13] = [
    "select", "from", "where", "and", "insert", "into", "values", "update", "set", "delete",
    "true", "false", "null",
];

/// Validates a name follows identifier rules and is not a reserved word.
fn check_naming_rules(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return Err(SchemaError::invalid_name(name, "name cannot be empty")),
    };
    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(SchemaError::invalid_name(
            name,
            "name must start with a letter or underscore",
        ));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SchemaError::invalid_name(name, "name contains invalid characters"));
    }
    if RESERVED.iter().any(|word| word.eq_ignore_ascii_case(name)) {
        return Err(SchemaError::invalid_name(name, "name is a reserved word"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnSpec;

    fn users() -> Table {
        TableBuilder::new("users")
            .unwrap()
            .add_column("user_id", DataType::Int)
            .unwrap()
            .add_column("name", DataType::Text)
            .unwrap()
            .add_column("email", DataType::Text)
            .unwrap()
            .add_nullable(&["email"])
            .add_primary_key("user_id")
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_table_builder() {
        let table = users();
        assert_eq!(table.name(), "users");
        assert_eq!(table.width(), 3);
        assert_eq!(table.primary_key_index(), 0);
        assert_eq!(table.primary_key().name(), "user_id");
        assert!(table.get_column("email").unwrap().is_nullable());
        assert!(!table.get_column("name").unwrap().is_nullable());
        assert_eq!(table.get_column_index("name"), Some(1));
        assert_eq!(table.columns()[2].index(), 2);
    }

    #[test]
    fn test_missing_primary_key() {
        let err = TableBuilder::new("t")
            .unwrap()
            .add_column("a", DataType::Int)
            .unwrap()
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidColumn { .. }));
    }

    #[test]
    fn test_two_primary_keys() {
        let err = TableBuilder::new("t")
            .unwrap()
            .add_column("a", DataType::Int)
            .unwrap()
            .add_column("b", DataType::Int)
            .unwrap()
            .add_primary_key("a")
            .unwrap()
            .add_primary_key("b")
            .unwrap()
            .build()
            .unwrap_err();
        match err {
            SchemaError::InvalidColumn { column, .. } => assert_eq!(column, "b"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_nullable_primary_key_rejected() {
        let err = TableBuilder::new("t")
            .unwrap()
            .add_column("a", DataType::Int)
            .unwrap()
            .add_nullable(&["a"])
            .add_primary_key("a")
            .unwrap()
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidColumn { .. }));
    }

    #[test]
    fn test_duplicate_column() {
        let result = TableBuilder::new("t")
            .unwrap()
            .add_column("a", DataType::Int)
            .unwrap()
            .add_column("a", DataType::Text);
        assert!(matches!(result, Err(SchemaError::InvalidColumn { .. })));
    }

    #[test]
    fn test_naming_rules() {
        assert!(matches!(TableBuilder::new(""), Err(SchemaError::InvalidName { .. })));
        assert!(matches!(TableBuilder::new("9lives"), Err(SchemaError::InvalidName { .. })));
        assert!(matches!(TableBuilder::new("a-b"), Err(SchemaError::InvalidName { .. })));
        assert!(TableBuilder::new("_ok1").is_ok());
    }

    #[test]
    fn test_reserved_words_rejected() {
        for name in ["select", "FROM", "Values", "null"] {
            assert!(
                matches!(TableBuilder::new(name), Err(SchemaError::InvalidName { .. })),
                "{name}"
            );
        }
        let err = TableBuilder::new("t").unwrap().add_column("where", DataType::Int);
        assert!(matches!(err, Err(SchemaError::InvalidName { .. })));
        assert!(TableBuilder::new("selection").is_ok());
        assert!(TableBuilder::new("t").unwrap().add_column("value", DataType::Int).is_ok());
    }

    #[test]
    fn test_from_spec() {
        let spec = TableSpec {
            name: "users".into(),
            columns: vec![
                ColumnSpec::new("user_id", "int").primary_key(),
                ColumnSpec::new("name", "text"),
                ColumnSpec::new("email", "TEXT").nullable(),
            ],
        };
        assert_eq!(Table::from_spec(&spec).unwrap(), users());
    }

    #[test]
    fn test_from_spec_unknown_type() {
        let spec = TableSpec {
            name: "users".into(),
            columns: vec![
                ColumnSpec::new("user_id", "int").primary_key(),
                ColumnSpec::new("name", "varchar"),
            ],
        };
        match Table::from_spec(&spec).unwrap_err() {
            SchemaError::InvalidColumn { column, reason, .. } => {
                assert_eq!(column, "name");
                assert!(reason.contains("varchar"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
