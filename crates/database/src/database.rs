//! Database - Main entry point for Rivulet.
//!
//! This module provides the `Database` struct which ties the schema registry,
//! store, subscription manager, mutation pipeline and effect dispatcher
//! together behind one cheaply clonable handle.

use crate::binding::QueryBinding;
use crate::config::DatabaseConfig;
use crate::effects::EffectDispatcher;
use crate::error::{DatabaseError, MutationError, Result};
use crate::pipeline::MutationPipeline;
use parking_lot::Mutex;
use rivulet_core::schema::{SchemaRegistry, Table, TableSpec};
use rivulet_query::{execute, ExecError, Params, QueryCache, QueryDescriptor, ResultSet};
use rivulet_reactive::{SubscriptionHandle, SubscriptionManager};
use rivulet_storage::{
    EventLog, EventLogEntry, MutationOutcome, ReplayError, Sequence, SharedStore, Store,
};
use std::sync::Arc;
use tracing::{debug, error, info};

/// What `Database::run` produced.
#[derive(Debug)]
pub enum RunOutput {
    /// A select: the live subscription.
    Subscription(SubscriptionHandle),
    /// An insert, update or delete: what it changed.
    Mutation(MutationOutcome),
}

impl RunOutput {
    pub fn into_subscription(self) -> Option<SubscriptionHandle> {
        match self {
            RunOutput::Subscription(handle) => Some(handle),
            RunOutput::Mutation(_) => None,
        }
    }

    pub fn into_outcome(self) -> Option<MutationOutcome> {
        match self {
            RunOutput::Mutation(outcome) => Some(outcome),
            RunOutput::Subscription(_) => None,
        }
    }
}

struct Inner {
    config: DatabaseConfig,
    registry: SchemaRegistry,
    store: SharedStore,
    log: Arc<Mutex<EventLog>>,
    cache: Mutex<QueryCache>,
    subscriptions: Arc<SubscriptionManager>,
    effects: Arc<EffectDispatcher>,
    pipeline: MutationPipeline,
}

/// The main database interface.
///
/// Provides methods for:
/// - Defining tables
/// - Compiling query strings into descriptors
/// - Running selects as live subscriptions and mutations through the pipeline
/// - Registering effect adapters
/// - Replaying the event log
#[derive(Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    /// Creates a database with the default configuration.
    pub fn new() -> Self {
        Self::with_config(DatabaseConfig::default())
    }

    pub fn with_config(config: DatabaseConfig) -> Self {
        let store = Store::new().into_shared();
        let log = Arc::new(Mutex::new(EventLog::new()));
        let subscriptions = Arc::new(SubscriptionManager::with_panic_isolation(
            store.clone(),
            config.isolate_listener_panics,
        ));
        let effects = Arc::new(EffectDispatcher::new(log.clone(), config.hook_retries));
        let pipeline = MutationPipeline::new(
            store.clone(),
            log.clone(),
            subscriptions.clone(),
            effects.clone(),
            config.log_retention,
        );
        info!(name = %config.name, retention = ?config.log_retention, "database created");
        Self {
            inner: Arc::new(Inner {
                cache: Mutex::new(QueryCache::new(config.descriptor_cache_capacity)),
                config,
                registry: SchemaRegistry::new(),
                store,
                log,
                subscriptions,
                effects,
                pipeline,
            }),
        }
    }

    /// Returns the database name.
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.inner.registry
    }

    /// Registers a table and creates its storage.
    pub fn define_table(&self, table: Table) -> Result<Arc<Table>> {
        let table = self.inner.registry.define(table)?;
        self.inner.store.write().create_table(table.clone());
        Ok(table)
    }

    /// Registers a table from a declarative spec.
    pub fn define_spec(&self, spec: &TableSpec) -> Result<Arc<Table>> {
        let table = self.inner.registry.define_spec(spec)?;
        self.inner.store.write().create_table(table.clone());
        Ok(table)
    }

    /// Returns all table names.
    pub fn table_names(&self) -> Vec<String> {
        self.inner
            .registry
            .tables()
            .iter()
            .map(|t| t.name().to_string())
            .collect()
    }

    /// Parses a query string, reusing a cached descriptor for repeated text.
    pub fn compile(&self, query: &str) -> Result<Arc<QueryDescriptor>> {
        let descriptor = self.inner.cache.lock().compile(query, &self.inner.registry)?;
        Ok(descriptor)
    }

    /// Executes a select once, without subscribing.
    pub fn query(
        &self,
        descriptor: &QueryDescriptor,
        params: &Params,
    ) -> std::result::Result<ResultSet, ExecError> {
        execute(descriptor, params, &self.inner.store)
    }

    /// Starts a live subscription on a select.
    pub fn subscribe(
        &self,
        descriptor: Arc<QueryDescriptor>,
        params: Params,
    ) -> std::result::Result<SubscriptionHandle, ExecError> {
        self.inner.subscriptions.subscribe(descriptor, params)
    }

    /// Runs an insert, update or delete through the mutation pipeline.
    pub fn mutate(
        &self,
        descriptor: &QueryDescriptor,
        params: &Params,
    ) -> std::result::Result<MutationOutcome, MutationError> {
        self.inner.pipeline.run(descriptor, params)
    }

    /// Runs any descriptor: selects subscribe, everything else mutates.
    pub async fn run(&self, descriptor: Arc<QueryDescriptor>, params: Params) -> Result<RunOutput> {
        if descriptor.is_mutation() {
            let outcome = self.mutate(&descriptor, &params)?;
            Ok(RunOutput::Mutation(outcome))
        } else {
            let handle = self.subscribe(descriptor, params)?;
            Ok(RunOutput::Subscription(handle))
        }
    }

    /// Binds a select to a context through a parameter resolver.
    pub fn bind<C, F>(&self, descriptor: Arc<QueryDescriptor>, resolver: F) -> QueryBinding<C>
    where
        F: Fn(&C) -> Params + Send + Sync + 'static,
    {
        QueryBinding::new(self.inner.subscriptions.clone(), descriptor, resolver)
    }

    /// Returns the effect-adapter dispatcher.
    pub fn effects(&self) -> &Arc<EffectDispatcher> {
        &self.inner.effects
    }

    pub fn subscriptions(&self) -> &Arc<SubscriptionManager> {
        &self.inner.subscriptions
    }

    /// Returns the current revision of a table.
    pub fn revision(&self, table: &str) -> Option<u64> {
        self.inner.store.read().revision(table)
    }

    /// Returns a copy of the current store.
    pub fn snapshot(&self) -> Store {
        self.inner.store.read().clone()
    }

    /// Sequence of the latest committed entry; 0 before the first commit.
    pub fn last_sequence(&self) -> Sequence {
        self.inner.log.lock().last_sequence()
    }

    /// Retained log entries after `after`, in commit order.
    pub fn entries_since(&self, after: Sequence) -> Vec<Arc<EventLogEntry>> {
        self.inner.log.lock().entries_since(after)
    }

    /// Rebuilds the store as it was right after sequence `upto` (or now, for `None`).
    pub fn replay_to(&self, upto: Option<Sequence>) -> std::result::Result<Store, ReplayError> {
        let tables = self.inner.registry.tables();
        self.inner.log.lock().replay(&tables, upto)
    }

    /// Replays the whole log and compares the result with the live store.
    pub fn verify_replay(&self) -> Result<bool> {
        let _gate = self
            .inner
            .pipeline
            .quiesce()
            .ok_or(DatabaseError::Mutation(MutationError::Reentrant))?;
        let replayed = self.replay_to(None)?;
        let live = self.inner.store.read();
        let matches = *live == replayed;
        if !matches {
            error!(
                sequence = self.last_sequence(),
                live_rows = live.total_row_count(),
                replayed_rows = replayed.total_row_count(),
                "replay diverged from live store"
            );
        }
        Ok(matches)
    }

    /// Forgets every table, row, log entry, subscription and adapter.
    ///
    /// Outstanding subscription handles go inactive and effect streams end.
    pub fn reset(&self) -> std::result::Result<(), MutationError> {
        let _gate = self.inner.pipeline.quiesce().ok_or(MutationError::Reentrant)?;
        self.inner.subscriptions.clear();
        self.inner.effects.clear();
        self.inner.log.lock().clear();
        *self.inner.store.write() = Store::new();
        self.inner.cache.lock().clear();
        self.inner.registry.reset();
        debug!(name = %self.inner.config.name, "database reset");
        Ok(())
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name())
            .field("tables", &self.table_names())
            .field("last_sequence", &self.last_sequence())
            .finish()
    }
}
