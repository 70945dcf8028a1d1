//! Live query implementation.
//!
//! A `LiveQuery` wraps a select descriptor with its bound parameters and keeps
//! the last result it produced. It re-executes when the subscription manager
//! hands it an event-log entry for its table, and reports a `ChangeSet` only
//! when the visible rows actually changed.
//!
//! Two shortcuts avoid re-execution: an entry whose revision the query has
//! already observed is skipped, and so is an entry none of whose row images
//! (before or after) satisfies the query's filter, since such a change cannot
//! alter the result.

use crate::change_set::ChangeSet;
use crate::subscription::{notify_listeners, ListenerId, ListenerSet};
use parking_lot::Mutex;
use rivulet_query::{
    execute_resolved, resolve_filter, DataSource, ExecError, Params, QueryDescriptor, ResultSet,
};
use rivulet_storage::{EventLogEntry, Filter, RowChange};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::trace;

/// Unique identifier for a live subscription.
pub type SubscriptionId = u64;

/// Observable state of a live query.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryState {
    /// The first execution has not completed yet.
    Loading,
    /// The latest result.
    Ready(ResultSet),
    /// Parameters were missing or ill-typed, or the table is gone.
    Failed(ExecError),
}

impl QueryState {
    #[inline]
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self, QueryState::Ready(_))
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self, QueryState::Failed(_))
    }

    pub fn result(&self) -> Option<&ResultSet> {
        match self {
            QueryState::Ready(result) => Some(result),
            _ => None,
        }
    }

    pub fn into_result(self) -> Option<ResultSet> {
        match self {
            QueryState::Ready(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ExecError> {
        match self {
            QueryState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

struct LiveState {
    params: Params,
    /// Resolved predicate; `None` while the bound parameters are unusable.
    filter: Option<Filter>,
    state: QueryState,
    /// Table revision the current result reflects.
    revision: Option<u64>,
}

/// A running select with its last-known result and listeners.
pub struct LiveQuery {
    id: SubscriptionId,
    descriptor: Arc<QueryDescriptor>,
    inner: Mutex<LiveState>,
    listeners: Mutex<ListenerSet>,
    watch: watch::Sender<QueryState>,
    active: AtomicBool,
    /// Bumped whenever the state changes; a delivery in flight for an older
    /// generation stops.
    generation: AtomicU64,
}

impl LiveQuery {
    /// Creates a live query in the loading state.
    ///
    /// Fails only if the descriptor is not a select. Binding problems are
    /// recorded as a `Failed` state instead.
    pub fn new(
        id: SubscriptionId,
        descriptor: Arc<QueryDescriptor>,
        params: Params,
    ) -> Result<Self, ExecError> {
        if descriptor.as_select().is_none() {
            return Err(ExecError::NotASelect {
                kind: descriptor.kind().name(),
            });
        }
        let (watch, _) = watch::channel(QueryState::Loading);
        let query = Self {
            id,
            descriptor,
            inner: Mutex::new(LiveState {
                params: Params::new(),
                filter: None,
                state: QueryState::Loading,
                revision: None,
            }),
            listeners: Mutex::new(ListenerSet::new()),
            watch,
            active: AtomicBool::new(true),
            generation: AtomicU64::new(0),
        };
        query.bind(params);
        Ok(query)
    }

    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn descriptor(&self) -> &Arc<QueryDescriptor> {
        &self.descriptor
    }

    /// Returns the table this query depends on.
    pub fn table(&self) -> &str {
        self.descriptor.table()
    }

    pub fn params(&self) -> Params {
        self.inner.lock().params.clone()
    }

    pub fn state(&self) -> QueryState {
        self.inner.lock().state.clone()
    }

    /// Returns the table revision the current result reflects.
    pub fn revision(&self) -> Option<u64> {
        self.inner.lock().revision
    }

    pub fn watch(&self) -> watch::Receiver<QueryState> {
        self.watch.subscribe()
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Marks the query inactive and drops its listeners.
    ///
    /// Returns true only for the call that actually deactivated it.
    pub fn deactivate(&self) -> bool {
        let was_active = self.active.swap(false, Ordering::AcqRel);
        if was_active {
            self.listeners.lock().clear();
        }
        was_active
    }

    pub fn add_listener<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&ChangeSet) + Send + Sync + 'static,
    {
        self.listeners.lock().add(callback)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.lock().remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Replaces the bound parameters and forgets the observed revision.
    ///
    /// Does not execute; follow with `refresh(source, true)`.
    pub fn bind(&self, params: Params) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        match self.resolve(&params) {
            Ok(filter) => inner.filter = Some(filter),
            Err(err) => {
                inner.filter = None;
                inner.state = QueryState::Failed(err);
                self.watch.send_replace(inner.state.clone());
            }
        }
        inner.params = params;
        inner.revision = None;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn resolve(&self, params: &Params) -> Result<Filter, ExecError> {
        params.check_complete(&self.descriptor)?;
        match self.descriptor.predicate() {
            Some(predicate) => resolve_filter(predicate, params),
            None => Ok(Filter::all()),
        }
    }

    /// Handles a committed mutation.
    ///
    /// Returns the change to report, or `None` if the result is unaffected.
    pub fn on_entry<S: DataSource + ?Sized>(
        &self,
        entry: &EventLogEntry,
        source: &S,
    ) -> Option<ChangeSet> {
        if !self.is_active() || entry.table != self.table() {
            return None;
        }
        {
            let mut inner = self.inner.lock();
            if inner.revision.is_some_and(|seen| entry.revision <= seen) {
                trace!(subscription = self.id, revision = entry.revision, "entry already observed");
                return None;
            }
            let filter = inner.filter.as_ref()?;
            let relevant = entry
                .changes
                .iter()
                .flat_map(RowChange::images)
                .any(|row| filter.matches(row));
            if !relevant {
                trace!(subscription = self.id, sequence = entry.sequence, "entry outside filter");
                inner.revision = Some(entry.revision);
                return None;
            }
        }
        self.refresh(source, false)
    }

    /// Re-executes the query against the source.
    ///
    /// Without `force`, an unchanged result (compared order-insensitively)
    /// yields `None`. With `force`, any successful execution yields a change
    /// set.
    pub fn refresh<S: DataSource + ?Sized>(&self, source: &S, force: bool) -> Option<ChangeSet> {
        let select = self.descriptor.as_select()?;
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let filter = inner.filter.as_ref()?;

        let snapshot = match source.table_state(&select.table) {
            Some(snapshot) => snapshot,
            None => {
                inner.state = QueryState::Failed(ExecError::UnknownTable {
                    table: select.table.clone(),
                });
                self.watch.send_replace(inner.state.clone());
                return None;
            }
        };
        let result = execute_resolved(select, filter, &snapshot);
        inner.revision = Some(snapshot.revision());

        let previous = inner.state.result();
        if !force && previous.is_some_and(|p| p.same_rows(&result)) {
            trace!(subscription = self.id, rows = result.len(), "result unchanged");
            return None;
        }
        trace!(subscription = self.id, rows = result.len(), "result changed");
        let changes = ChangeSet::diff(previous, result.clone());
        inner.state = QueryState::Ready(result);
        self.watch.send_replace(inner.state.clone());
        self.generation.fetch_add(1, Ordering::SeqCst);
        Some(changes)
    }

    /// Invokes every listener with the change set, in registration order.
    ///
    /// Call right after the `refresh` that produced `changes`. If a listener
    /// triggers a newer refresh, the remaining listeners are skipped: they
    /// receive the newer change set instead. Returns the number of listeners
    /// that panicked.
    pub fn notify(&self, changes: &ChangeSet, isolate: bool) -> usize {
        if !self.is_active() {
            return 0;
        }
        let generation = self.generation.load(Ordering::SeqCst);
        let listeners = self.listeners.lock().snapshot();
        notify_listeners(self.id, &listeners, changes, isolate, || {
            self.is_active() && self.generation.load(Ordering::SeqCst) == generation
        })
    }
}
