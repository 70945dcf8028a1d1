//! The mutation pipeline.
//!
//! `run` is the only way data changes. Mutations are strictly serialized:
//! each one resolves its placeholders, applies atomically to the store,
//! appends one event-log entry, re-evaluates every affected live query and
//! hands the entry to effect adapters, all before the next one starts.
//!
//! A mutation that fails, or that matches no rows, leaves no trace: no
//! revision bump, no log entry, no notification.

use crate::config::LogRetention;
use crate::effects::EffectDispatcher;
use crate::error::MutationError;
use parking_lot::{Mutex, MutexGuard};
use rivulet_query::{resolve_mutation, Params, QueryDescriptor};
use rivulet_reactive::SubscriptionManager;
use rivulet_storage::{EventLog, MutationOutcome, SharedStore, StoreError};
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

static NEXT_PIPELINE_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Pipelines this thread is currently committing through.
    static COMMITTING: RefCell<Vec<u64>> = const { RefCell::new(Vec::new()) };
}

/// Marks a pipeline as committing on the current thread until dropped.
struct CommitScope(u64);

impl CommitScope {
    fn enter(pipeline: u64) -> Option<Self> {
        COMMITTING.with(|active| {
            let mut active = active.borrow_mut();
            if active.contains(&pipeline) {
                None
            } else {
                active.push(pipeline);
                Some(CommitScope(pipeline))
            }
        })
    }

    fn is_active(pipeline: u64) -> bool {
        COMMITTING.with(|active| active.borrow().contains(&pipeline))
    }
}

impl Drop for CommitScope {
    fn drop(&mut self) {
        COMMITTING.with(|active| active.borrow_mut().retain(|p| *p != self.0));
    }
}

/// Serializes mutations and propagates their effects.
pub struct MutationPipeline {
    id: u64,
    store: SharedStore,
    log: Arc<Mutex<EventLog>>,
    subscriptions: Arc<SubscriptionManager>,
    effects: Arc<EffectDispatcher>,
    retention: LogRetention,
    gate: Mutex<()>,
}

impl MutationPipeline {
    pub fn new(
        store: SharedStore,
        log: Arc<Mutex<EventLog>>,
        subscriptions: Arc<SubscriptionManager>,
        effects: Arc<EffectDispatcher>,
        retention: LogRetention,
    ) -> Self {
        Self {
            id: NEXT_PIPELINE_ID.fetch_add(1, Ordering::Relaxed),
            store,
            log,
            subscriptions,
            effects,
            retention,
            gate: Mutex::new(()),
        }
    }

    /// Runs an insert, update or delete descriptor.
    ///
    /// When this returns `Ok`, every affected subscription has already
    /// re-executed and notified its listeners. Called from inside such a
    /// listener it fails with `Reentrant`.
    pub fn run(
        &self,
        descriptor: &QueryDescriptor,
        params: &Params,
    ) -> Result<MutationOutcome, MutationError> {
        if !descriptor.is_mutation() {
            return Err(MutationError::NotAMutation {
                kind: descriptor.kind().name(),
            });
        }
        let _scope = CommitScope::enter(self.id).ok_or(MutationError::Reentrant)?;
        let _gate = self.gate.lock();

        let table = descriptor.table();
        let width = self
            .store
            .read()
            .table(table)
            .map(|t| t.schema().width())
            .ok_or_else(|| StoreError::unknown_table(table))?;
        let op = resolve_mutation(descriptor, params, width)?;

        let outcome = self.store.write().apply(table, op)?;
        if outcome.is_empty() {
            debug!(table, kind = %outcome.kind, "mutation matched no rows");
            return Ok(outcome);
        }

        let entry = self.log.lock().append(&outcome);
        debug!(
            table,
            kind = %entry.kind,
            sequence = entry.sequence,
            revision = entry.revision,
            affected = outcome.affected(),
            "committed"
        );

        let notified = self.subscriptions.on_entry(&entry);
        trace!(sequence = entry.sequence, notified, "subscriptions updated");
        self.effects.dispatch(&entry);

        if self.retention == LogRetention::UntilAcknowledged {
            let through = self.effects.acknowledged_through(entry.sequence);
            self.log.lock().compact_through(through);
        }
        Ok(outcome)
    }

    /// Blocks new mutations until the guard is dropped.
    ///
    /// Returns `None` when called from inside a commit on this thread.
    pub fn quiesce(&self) -> Option<MutexGuard<'_, ()>> {
        if CommitScope::is_active(self.id) {
            return None;
        }
        Some(self.gate.lock())
    }

    pub fn retention(&self) -> LogRetention {
        self.retention
    }
}

impl std::fmt::Debug for MutationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationPipeline")
            .field("id", &self.id)
            .field("retention", &self.retention)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::RwLock;
    use rivulet_core::schema::{SchemaRegistry, TableBuilder};
    use rivulet_core::{DataType, Value};
    use rivulet_query::parse;
    use rivulet_storage::Store;
    use std::sync::atomic::AtomicUsize;

    struct Fixture {
        registry: SchemaRegistry,
        store: SharedStore,
        log: Arc<Mutex<EventLog>>,
        subscriptions: Arc<SubscriptionManager>,
        effects: Arc<EffectDispatcher>,
        pipeline: MutationPipeline,
    }

    fn fixture(retention: LogRetention) -> Fixture {
        let registry = SchemaRegistry::new();
        let users = registry
            .define(
                TableBuilder::new("users")
                    .unwrap()
                    .add_column("user_id", DataType::Int)
                    .unwrap()
                    .add_column("name", DataType::Text)
                    .unwrap()
                    .add_primary_key("user_id")
                    .unwrap()
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let store: SharedStore = Arc::new(RwLock::new(Store::with_tables([&users])));
        let log = Arc::new(Mutex::new(EventLog::new()));
        let subscriptions = Arc::new(SubscriptionManager::new(store.clone()));
        let effects = Arc::new(EffectDispatcher::new(log.clone(), 0));
        let pipeline = MutationPipeline::new(
            store.clone(),
            log.clone(),
            subscriptions.clone(),
            effects.clone(),
            retention,
        );
        Fixture {
            registry,
            store,
            log,
            subscriptions,
            effects,
            pipeline,
        }
    }

    impl Fixture {
        fn run(&self, query: &str, params: Params) -> Result<MutationOutcome, MutationError> {
            let descriptor = parse(query, &self.registry).unwrap();
            self.pipeline.run(&descriptor, &params)
        }

        fn insert(&self, id: i64, name: &str) -> MutationOutcome {
            self.run(
                "insert into users (user_id, name) values (:id, :name)",
                Params::new().bind("id", id).bind("name", name),
            )
            .unwrap()
        }

        fn revision(&self) -> u64 {
            self.store.read().revision("users").unwrap()
        }
    }

    #[test]
    fn test_commit_appends_entry() {
        let fx = fixture(LogRetention::KeepAll);
        let outcome = fx.insert(1, "Ann");
        assert_eq!(outcome.affected(), 1);
        assert_eq!(fx.revision(), 1);

        let log = fx.log.lock();
        assert_eq!(log.len(), 1);
        let entry = log.get(1).unwrap();
        assert_eq!(entry.table, "users");
        assert_eq!(entry.affected_keys(), vec![Value::Int(1)]);
    }

    #[test]
    fn test_missing_binding_touches_nothing() {
        let fx = fixture(LogRetention::KeepAll);
        let err = fx
            .run(
                "insert into users (user_id, name) values (:id, :name)",
                Params::new().bind("id", 1),
            )
            .unwrap_err();
        assert_eq!(err, MutationError::MissingBinding { name: "name".into() });
        assert_eq!(fx.revision(), 0);
        assert!(fx.log.lock().is_empty());
    }

    #[test]
    fn test_store_error_leaves_no_entry() {
        let fx = fixture(LogRetention::KeepAll);
        fx.insert(1, "Ann");
        let err = fx
            .run(
                "insert into users (user_id, name) values (1, 'Bob')",
                Params::new(),
            )
            .unwrap_err();
        assert!(matches!(err, MutationError::Store(StoreError::DuplicateKey { .. })));
        assert_eq!(fx.revision(), 1);
        assert_eq!(fx.log.lock().len(), 1);
    }

    #[test]
    fn test_zero_rows_is_silent() {
        let fx = fixture(LogRetention::KeepAll);
        let outcome = fx
            .run(
                "delete from users where user_id = :id",
                Params::new().bind("id", 99),
            )
            .unwrap();
        assert_eq!(outcome.affected(), 0);
        assert_eq!(fx.revision(), 0);
        assert!(fx.log.lock().is_empty());
    }

    #[test]
    fn test_select_rejected() {
        let fx = fixture(LogRetention::KeepAll);
        let err = fx.run("select * from users", Params::new()).unwrap_err();
        assert_eq!(err, MutationError::NotAMutation { kind: "select" });
    }

    #[test]
    fn test_reentrant_mutation_rejected() {
        let fx = Arc::new(fixture(LogRetention::KeepAll));
        let descriptor = Arc::new(parse("select * from users", &fx.registry).unwrap());
        let handle = fx.subscriptions.subscribe(descriptor, Params::new()).unwrap();

        let inner = Arc::new(parse("delete from users", &fx.registry).unwrap());
        let result = Arc::new(Mutex::new(None));
        {
            let fx = Arc::downgrade(&fx);
            let result = result.clone();
            handle.on_change(move |_| {
                if let Some(fx) = fx.upgrade() {
                    *result.lock() = Some(fx.pipeline.run(&inner, &Params::new()));
                }
            });
        }

        fx.insert(1, "Ann");
        assert_eq!(*result.lock(), Some(Err(MutationError::Reentrant)));
        // the outer mutation still committed
        assert_eq!(fx.store.read().total_row_count(), 1);
        assert!(fx.pipeline.quiesce().is_some());
    }

    #[test]
    fn test_notifies_before_returning() {
        let fx = fixture(LogRetention::KeepAll);
        let descriptor = Arc::new(parse("select * from users", &fx.registry).unwrap());
        let handle = fx.subscriptions.subscribe(descriptor, Params::new()).unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        handle.on_change(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        fx.insert(1, "Ann");
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(handle.result().unwrap().len(), 1);
    }

    #[test]
    fn test_compaction_until_acknowledged() {
        let fx = fixture(LogRetention::UntilAcknowledged);
        let stream = fx.effects.subscribe(None, 0).unwrap();
        fx.insert(1, "Ann");
        fx.insert(2, "Bob");
        assert_eq!(fx.log.lock().len(), 2);

        stream.ack(1);
        fx.insert(3, "Cy");
        assert_eq!(fx.log.lock().first_retained(), Some(2));

        drop(stream);
        fx.insert(4, "Di");
        assert!(fx.log.lock().is_empty());
        assert_eq!(fx.log.lock().last_sequence(), 4);
    }
}
