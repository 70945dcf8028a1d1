//! Rivulet Query - Query language front end and execution engine.
//!
//! This crate provides:
//!
//! - `parser`: Tokenizer and recursive-descent parser for the query language
//! - `ast`: Immutable query descriptors and their canonical text form
//! - `params`: Bound parameters and placeholder resolution
//! - `executor`: Select execution against store snapshots
//! - `result`: Result sets and order-insensitive comparison
//! - `plan_cache`: LRU cache of compiled descriptors
//!
//! # Example
//!
//! ```rust
//! use rivulet_core::schema::{SchemaRegistry, TableBuilder};
//! use rivulet_core::{DataType, Row, Value};
//! use rivulet_query::{execute, parse, Params};
//! use rivulet_storage::{MutationOp, Store};
//!
//! let registry = SchemaRegistry::new();
//! let users = registry
//!     .define(
//!         TableBuilder::new("users")
//!             .unwrap()
//!             .add_column("user_id", DataType::Int)
//!             .unwrap()
//!             .add_column("name", DataType::Text)
//!             .unwrap()
//!             .add_primary_key("user_id")
//!             .unwrap()
//!             .build()
//!             .unwrap(),
//!     )
//!     .unwrap();
//! let mut store = Store::with_tables([&users]);
//! let row = Row::new(vec![Value::Int(1), Value::from("Ann")]);
//! store.apply("users", MutationOp::Insert { rows: vec![row] }).unwrap();
//!
//! let query = parse("select name from users where user_id = :id", &registry).unwrap();
//! let result = execute(&query, &Params::new().bind("id", 1), &store).unwrap();
//! assert_eq!(result.value(0, "name"), Some(&Value::from("Ann")));
//! ```

pub mod ast;
pub mod error;
pub mod executor;
pub mod params;
pub mod parser;
pub mod plan_cache;
pub mod result;

pub use ast::{QueryDescriptor, QueryKind};
pub use error::{ExecError, ParseError};
pub use executor::{execute, execute_resolved, DataSource};
pub use params::{resolve_filter, resolve_mutation, Params};
pub use parser::parse;
pub use plan_cache::QueryCache;
pub use result::ResultSet;
