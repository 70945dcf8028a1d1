//! Column definitions.

use crate::types::DataType;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Why a column refused a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// `Null` written to a non-nullable column.
    Null,
    /// A value that does not coerce to the declared type; carries its type name.
    Type(&'static str),
}

/// One column of a table schema.
///
/// Columns are positional: `index` is the column's slot in every stored row
/// and is assigned by `TableBuilder::build`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    data_type: DataType,
    nullable: bool,
    primary_key: bool,
    index: usize,
}

impl Column {
    /// Creates a non-nullable, non-key column.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
            primary_key: false,
            index: 0,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        self
    }

    pub(crate) fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    #[inline]
    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    /// Position of this column in a row.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Converts a value into this column's stored representation.
    ///
    /// `Null` passes only for nullable columns; other values must coerce to
    /// the declared type (`Int` widens to `Float` and `Timestamp`).
    pub fn admit(&self, value: Value) -> Result<Value, Rejection> {
        if value.is_null() {
            return if self.nullable {
                Ok(Value::Null)
            } else {
                Err(Rejection::Null)
            };
        }
        value
            .coerce_to(self.data_type)
            .ok_or(Rejection::Type(value.type_name()))
    }
}
