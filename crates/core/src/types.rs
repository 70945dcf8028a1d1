//! Data type definitions for Rivulet.
//!
//! This module defines the column types that can be declared in a table schema.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Declared column types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 64-bit signed integer
    Int,
    /// 64-bit floating point number
    Float,
    /// UTF-8 string, compared lexically (case-sensitive)
    Text,
    /// Boolean type (true/false)
    Boolean,
    /// Point in time stored as Unix milliseconds
    Timestamp,
}

impl DataType {
    /// Returns the canonical lower-case name used in schema declarations.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Text => "text",
            DataType::Boolean => "boolean",
            DataType::Timestamp => "timestamp",
        }
    }

    /// Returns true for types compared numerically.
    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int | DataType::Float | DataType::Timestamp)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a type name is not recognized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownType(pub String);

impl FromStr for DataType {
    type Err = UnknownType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" | "bigint" => Ok(DataType::Int),
            "float" | "real" | "double" => Ok(DataType::Float),
            "text" | "string" => Ok(DataType::Text),
            "boolean" | "bool" => Ok(DataType::Boolean),
            "timestamp" | "datetime" => Ok(DataType::Timestamp),
            _ => Err(UnknownType(s.to_string())),
        }
    }
}
