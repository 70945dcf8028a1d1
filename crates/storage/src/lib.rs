//! Rivulet Storage - Table storage and the mutation event log.
//!
//! This crate provides the storage layer including:
//!
//! - `Store`: Multi-table storage applying resolved mutations atomically
//! - `RowStore`: Rows of one table keyed by primary key, with a revision counter
//! - `TableState`: Immutable snapshot of one table
//! - `Filter`: Resolved conjunctive row predicates
//! - `MutationOp` / `MutationOutcome`: What to change and what changed
//! - `Journal` / `Transaction`: Change tracking with rollback
//! - `ConstraintChecker`: Type, not-null and row-width validation
//! - `EventLog`: Append-only record of committed mutations, with replay
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use rivulet_core::schema::TableBuilder;
//! use rivulet_core::{DataType, Row, Value};
//! use rivulet_storage::{EventLog, MutationOp, Store};
//!
//! let schema = Arc::new(
//!     TableBuilder::new("users")
//!         .unwrap()
//!         .add_column("id", DataType::Int)
//!         .unwrap()
//!         .add_column("name", DataType::Text)
//!         .unwrap()
//!         .add_primary_key("id")
//!         .unwrap()
//!         .build()
//!         .unwrap(),
//! );
//! let mut store = Store::with_tables([&schema]);
//! let mut log = EventLog::new();
//!
//! let row = Row::new(vec![Value::Int(1), Value::Text("Alice".into())]);
//! let outcome = store.apply("users", MutationOp::Insert { rows: vec![row] }).unwrap();
//! log.append(&outcome);
//!
//! assert_eq!(store.read("users").unwrap().len(), 1);
//! assert_eq!(log.replay(&[schema], None).unwrap(), store);
//! ```

pub mod constraint;
pub mod error;
pub mod event_log;
pub mod filter;
pub mod journal;
pub mod mutation;
pub mod row_store;
pub mod store;
pub mod transaction;

pub use constraint::ConstraintChecker;
pub use error::{ReplayError, Result, StoreError};
pub use event_log::{EventLog, EventLogEntry, Sequence};
pub use filter::{Condition, Filter};
pub use journal::{Journal, JournalEntry};
pub use mutation::{Assignment, MutationKind, MutationOp, MutationOutcome, RowChange};
pub use row_store::{RowStore, TableState};
pub use store::{SharedStore, Store};
pub use transaction::{Transaction, TransactionId};
