//! Schema module for Rivulet.
//!
//! This module contains column and table definitions, the declarative specs they
//! can be built from, and the registry that freezes them.

mod column;
mod registry;
mod spec;
mod table;

pub use column::{Column, Rejection};
pub use registry::SchemaRegistry;
pub use spec::{ColumnSpec, TableSpec};
pub use table::{Table, TableBuilder};
