//! Subscription index and notification routing.
//!
//! The `SubscriptionManager` maps each table to the live queries that depend
//! on it. For every committed event-log entry it re-evaluates only the queries
//! on the mutated table and notifies listeners of those whose result changed.
//!
//! The index holds weak references; a `SubscriptionHandle` owns its query.
//! The index lock is never held while queries execute or listeners run, so
//! listeners may subscribe or unsubscribe freely.
//!
//! Re-execution plus notification, whether triggered by a commit or by a
//! rebind, runs under one reentrant delivery lock. Deliveries from different
//! threads never interleave, so a listener's last change set always matches
//! its query's state. A listener must not block on another thread that
//! rebinds or commits.

use crate::observable::{LiveQuery, SubscriptionId};
use crate::subscription::SubscriptionHandle;
use hashbrown::HashMap;
use parking_lot::{ReentrantMutex, RwLock};
use rivulet_query::{DataSource, ExecError, Params, QueryDescriptor};
use rivulet_storage::EventLogEntry;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Shared handle to whatever the live queries read from.
pub type SharedSource = Arc<dyn DataSource + Send + Sync>;

#[derive(Default)]
struct Index {
    /// Table name -> dependent queries, in registration order
    table_queries: HashMap<String, BTreeMap<SubscriptionId, Weak<LiveQuery>>>,
    /// Query ID -> table it depends on
    queries: BTreeMap<SubscriptionId, String>,
}

/// Tracks live subscriptions and routes committed mutations to them.
pub struct SubscriptionManager {
    index: RwLock<Index>,
    /// Serializes refresh-and-notify across threads.
    delivery: ReentrantMutex<()>,
    source: SharedSource,
    next_id: AtomicU64,
    isolate_panics: bool,
}

impl SubscriptionManager {
    /// Creates a manager reading from `source`, isolating listener panics.
    pub fn new(source: SharedSource) -> Self {
        Self::with_panic_isolation(source, true)
    }

    /// Creates a manager; with `isolate_panics` unset, listener panics propagate.
    pub fn with_panic_isolation(source: SharedSource, isolate_panics: bool) -> Self {
        Self {
            index: RwLock::new(Index::default()),
            delivery: ReentrantMutex::new(()),
            source,
            next_id: AtomicU64::new(1),
            isolate_panics,
        }
    }

    /// Starts a live query and returns the handle that owns it.
    ///
    /// The first execution runs before this returns. Missing or ill-typed
    /// parameters leave the handle in the `Failed` state; only a non-select
    /// descriptor is an error here.
    pub fn subscribe(
        self: &Arc<Self>,
        descriptor: Arc<QueryDescriptor>,
        params: Params,
    ) -> Result<SubscriptionHandle, ExecError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let query = Arc::new(LiveQuery::new(id, descriptor, params)?);
        let table = query.table().to_string();
        {
            let mut index = self.index.write();
            index
                .table_queries
                .entry(table.clone())
                .or_default()
                .insert(id, Arc::downgrade(&query));
            index.queries.insert(id, table.clone());
        }
        debug!(subscription = id, table = %table, query = %query.descriptor(), "subscribed");

        query.refresh(&*self.source, true);
        Ok(SubscriptionHandle::new(query, self.clone()))
    }

    pub(crate) fn rebind(&self, query: &LiveQuery, params: Params) -> Result<(), ExecError> {
        let _delivery = self.delivery.lock();
        query.bind(params);
        if let Some(changes) = query.refresh(&*self.source, true) {
            query.notify(&changes, self.isolate_panics);
        }
        match query.state().error() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Removes a subscription from the index.
    ///
    /// Returns true if it was found; calling it again is a no-op.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut index = self.index.write();
        let table = match index.queries.remove(&id) {
            Some(table) => table,
            None => return false,
        };
        if let Some(queries) = index.table_queries.get_mut(&table) {
            queries.remove(&id);
            if queries.is_empty() {
                index.table_queries.remove(&table);
            }
        }
        debug!(subscription = id, table = %table, "unsubscribed");
        true
    }

    /// Propagates one committed entry to the queries on its table.
    ///
    /// Runs synchronously: when this returns, every affected query has
    /// re-executed and its listeners have been invoked. Returns the number of
    /// subscriptions that were notified.
    pub fn on_entry(&self, entry: &EventLogEntry) -> usize {
        let (queries, dead) = self.affected(&entry.table);
        if !dead.is_empty() {
            let mut index = self.index.write();
            if let Some(queries) = index.table_queries.get_mut(&entry.table) {
                for id in &dead {
                    queries.remove(id);
                }
            }
            for id in &dead {
                index.queries.remove(id);
            }
        }

        let _delivery = self.delivery.lock();
        let mut notified = 0;
        for query in queries {
            if let Some(changes) = query.on_entry(entry, &*self.source) {
                let failures = query.notify(&changes, self.isolate_panics);
                notified += 1;
                debug!(
                    subscription = query.id(),
                    sequence = entry.sequence,
                    added = changes.added.len(),
                    removed = changes.removed.len(),
                    failures,
                    "notified"
                );
            }
        }
        notified
    }

    /// Live queries on `table` in registration order, plus IDs of dropped ones.
    fn affected(&self, table: &str) -> (Vec<Arc<LiveQuery>>, Vec<SubscriptionId>) {
        let index = self.index.read();
        let mut live = Vec::new();
        let mut dead = Vec::new();
        if let Some(queries) = index.table_queries.get(table) {
            for (&id, weak) in queries {
                match weak.upgrade() {
                    Some(query) => live.push(query),
                    None => dead.push(id),
                }
            }
        }
        (live, dead)
    }

    /// Returns the number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.index.read().queries.len()
    }

    /// Returns true if there are no live subscriptions.
    pub fn is_empty(&self) -> bool {
        self.index.read().queries.is_empty()
    }

    /// Returns the number of subscriptions depending on a specific table.
    pub fn subscriptions_for_table(&self, table: &str) -> usize {
        self.index
            .read()
            .table_queries
            .get(table)
            .map(|v| v.values().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Forgets every subscription. Outstanding handles stop receiving changes.
    pub fn clear(&self) {
        let queries: Vec<Arc<LiveQuery>> = {
            let mut index = self.index.write();
            index.queries.clear();
            index
                .table_queries
                .drain()
                .flat_map(|(_, queries)| queries.into_values())
                .filter_map(|weak| weak.upgrade())
                .collect()
        };
        for query in queries {
            query.deactivate();
        }
    }
}

impl std::fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("subscriptions", &self.subscription_count())
            .field("isolate_panics", &self.isolate_panics)
            .finish()
    }
}
