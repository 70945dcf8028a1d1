//! Rivulet Core - Core types and schema definitions for the Rivulet reactive store.
//!
//! This crate provides the foundational types shared by every other Rivulet crate:
//!
//! - `DataType`: Declared column types (Int, Float, Text, Boolean, Timestamp)
//! - `Value`: Runtime values that can be stored in a cell or bound to a placeholder
//! - `Row`: A row of values in schema column order
//! - `CompareOp`: Predicate comparators and their type-directed semantics
//! - `schema`: Table definitions and the `SchemaRegistry`
//! - `SchemaError`: Errors raised while defining tables
//!
//! # Example
//!
//! ```rust
//! use rivulet_core::{DataType, Row, Value};
//! use rivulet_core::schema::{SchemaRegistry, TableBuilder};
//!
//! let users = TableBuilder::new("users")
//!     .unwrap()
//!     .add_column("user_id", DataType::Int)
//!     .unwrap()
//!     .add_column("name", DataType::Text)
//!     .unwrap()
//!     .add_primary_key("user_id")
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let registry = SchemaRegistry::new();
//! registry.define(users).unwrap();
//! assert!(registry.lookup("users").is_some());
//!
//! let row = Row::new(vec![Value::Int(1), Value::Text("Ann".into())]);
//! assert_eq!(row.get(1), Some(&Value::Text("Ann".into())));
//! ```

mod compare;
mod error;
mod row;
pub mod schema;
mod types;
mod value;

pub use compare::CompareOp;
pub use error::{Result, SchemaError};
pub use row::Row;
pub use types::{DataType, UnknownType};
pub use value::Value;
