//! Rivulet - Reactive in-memory relational state store.
//!
//! This crate provides the public API for Rivulet: declare tables, compile
//! query strings once, run selects as live subscriptions that re-notify when
//! their result changes, and run mutations through a serialized pipeline that
//! records every commit in a replayable event log.
//!
//! # Core Components
//!
//! - `Database`: Main entry point
//! - `MutationPipeline`: Serialized, all-or-nothing mutation commits
//! - `EffectDispatcher`: Commit-ordered, at-least-once delivery to effect adapters
//! - `QueryBinding`: Keeps a subscription in step with a caller's context
//! - `DatabaseConfig`: Configuration, loadable from JSON
//!
//! # Example
//!
//! ```rust
//! use rivulet_database::{Database, Params};
//! use rivulet_core::schema::{ColumnSpec, TableSpec};
//!
//! let db = Database::new();
//! db.define_spec(&TableSpec {
//!     name: "users".into(),
//!     columns: vec![
//!         ColumnSpec::new("user_id", "int").primary_key(),
//!         ColumnSpec::new("name", "text"),
//!     ],
//! })
//! .unwrap();
//!
//! let users = db.compile("select * from users").unwrap();
//! let handle = db.subscribe(users, Params::new()).unwrap();
//! handle.on_change(|changes| println!("{} users", changes.result().len()));
//!
//! let insert = db
//!     .compile("insert into users (user_id, name) values (:id, :name)")
//!     .unwrap();
//! db.mutate(&insert, &Params::new().bind("id", 1).bind("name", "Ann"))
//!     .unwrap();
//! assert_eq!(handle.result().unwrap().len(), 1);
//! ```

pub mod binding;
pub mod config;
pub mod database;
pub mod effects;
pub mod error;
pub mod pipeline;

pub use binding::QueryBinding;
pub use config::{DatabaseConfig, LogRetention};
pub use database::{Database, RunOutput};
pub use effects::{AdapterId, EffectDispatcher, EffectStream};
pub use error::{DatabaseError, EffectError, MutationError, Result};
pub use pipeline::MutationPipeline;

pub use rivulet_query::{ExecError, Params, QueryDescriptor, ResultSet};
pub use rivulet_reactive::{ChangeSet, QueryState, SubscriptionHandle};
pub use rivulet_storage::{EventLogEntry, MutationOutcome, Sequence};
