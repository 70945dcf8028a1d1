//! Rivulet Reactive - Live queries for the Rivulet store.
//!
//! This crate keeps query results up to date as mutations commit. Each live
//! query records the table it depends on; when an event-log entry for that
//! table arrives, only the dependent queries re-execute, and listeners fire
//! only if the visible rows changed.
//!
//! # Core Concepts
//!
//! - `LiveQuery`: A select with bound parameters and its last result
//! - `QueryState`: Loading, a result, or a binding error
//! - `SubscriptionManager`: Routes committed entries to dependent queries
//! - `SubscriptionHandle`: Caller-owned handle; dropping it unsubscribes
//! - `ChangeSet`: Rows added and removed, plus the full new result
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use parking_lot::RwLock;
//! use rivulet_core::schema::{SchemaRegistry, TableBuilder};
//! use rivulet_core::{DataType, Row, Value};
//! use rivulet_query::{parse, Params};
//! use rivulet_reactive::SubscriptionManager;
//! use rivulet_storage::{EventLog, MutationOp, Store};
//!
//! let registry = SchemaRegistry::new();
//! let users = registry
//!     .define(
//!         TableBuilder::new("users")
//!             .unwrap()
//!             .add_column("user_id", DataType::Int)
//!             .unwrap()
//!             .add_primary_key("user_id")
//!             .unwrap()
//!             .build()
//!             .unwrap(),
//!     )
//!     .unwrap();
//! let store = Arc::new(RwLock::new(Store::with_tables([&users])));
//! let manager = Arc::new(SubscriptionManager::new(store.clone()));
//!
//! let query = Arc::new(parse("select * from users", &registry).unwrap());
//! let handle = manager.subscribe(query, Params::new()).unwrap();
//! handle.on_change(|changes| println!("now {} rows", changes.result().len()));
//!
//! let mut log = EventLog::new();
//! let outcome = store
//!     .write()
//!     .apply("users", MutationOp::Insert { rows: vec![Row::new(vec![Value::Int(1)])] })
//!     .unwrap();
//! manager.on_entry(&log.append(&outcome));
//! assert_eq!(handle.result().unwrap().len(), 1);
//! ```

pub mod change_set;
pub mod notify;
pub mod observable;
pub mod subscription;

pub use change_set::ChangeSet;
pub use notify::{SharedSource, SubscriptionManager};
pub use observable::{LiveQuery, QueryState, SubscriptionId};
pub use subscription::{ChangeCallback, ListenerId, ListenerSet, SubscriptionHandle};
