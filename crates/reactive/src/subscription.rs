//! Listeners and subscription handles.
//!
//! A `ListenerSet` holds the callbacks attached to one live query, in
//! registration order. A `SubscriptionHandle` is the caller's exclusive owner
//! of a live query: dropping it (or calling `unsubscribe`) detaches every
//! listener and removes the query from the dependency index.

use crate::change_set::ChangeSet;
use crate::notify::SubscriptionManager;
use crate::observable::{LiveQuery, QueryState, SubscriptionId};
use rivulet_query::{ExecError, Params, QueryDescriptor, ResultSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{trace, warn};

/// Unique identifier for a listener within one subscription.
pub type ListenerId = u64;

/// Callback type for change notifications.
pub type ChangeCallback = Arc<dyn Fn(&ChangeSet) + Send + Sync>;

struct Listener {
    id: ListenerId,
    callback: ChangeCallback,
}

/// Ordered set of listeners attached to a live query.
pub struct ListenerSet {
    listeners: Vec<Listener>,
    next_id: ListenerId,
}

impl Default for ListenerSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ListenerSet {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 1,
        }
    }

    /// Adds a listener and returns its ID.
    pub fn add<F>(&mut self, callback: F) -> ListenerId
    where
        F: Fn(&ChangeSet) + Send + Sync + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push(Listener {
            id,
            callback: Arc::new(callback),
        });
        id
    }

    /// Removes a listener by ID.
    ///
    /// Returns true if the listener was found and removed.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Returns the callbacks in registration order.
    ///
    /// Callers invoke the snapshot after releasing whatever lock guards the
    /// set, so a listener may add or remove listeners while being notified.
    pub fn snapshot(&self) -> Vec<(ListenerId, ChangeCallback)> {
        self.listeners
            .iter()
            .map(|l| (l.id, l.callback.clone()))
            .collect()
    }
}

/// Invokes each callback once, in order.
///
/// Delivery stops as soon as `current` returns false, which happens when a
/// newer result superseded `changes` mid-delivery. With `isolate` set, a
/// panicking listener is logged and skipped; the rest still run. Returns the
/// number of listeners that panicked.
pub fn notify_listeners(
    subscription: SubscriptionId,
    listeners: &[(ListenerId, ChangeCallback)],
    changes: &ChangeSet,
    isolate: bool,
    current: impl Fn() -> bool,
) -> usize {
    let mut failures = 0;
    for (id, callback) in listeners {
        if !current() {
            trace!(subscription, listener = *id, "change set superseded");
            break;
        }
        if !isolate {
            callback(changes);
            continue;
        }
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(changes))) {
            failures += 1;
            warn!(
                subscription,
                listener = *id,
                message = panic_message(payload.as_ref()),
                "listener panicked"
            );
        }
    }
    failures
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// The caller's handle on a live query.
///
/// Not `Clone`: the handle is the sole owner of the subscription. Dropping it
/// unsubscribes.
pub struct SubscriptionHandle {
    query: Arc<LiveQuery>,
    manager: Arc<SubscriptionManager>,
}

impl SubscriptionHandle {
    pub(crate) fn new(query: Arc<LiveQuery>, manager: Arc<SubscriptionManager>) -> Self {
        Self { query, manager }
    }

    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.query.id()
    }

    pub fn descriptor(&self) -> &Arc<QueryDescriptor> {
        self.query.descriptor()
    }

    /// Returns the currently bound parameters.
    pub fn params(&self) -> Params {
        self.query.params()
    }

    /// Returns the current state: loading, a result, or an error.
    pub fn state(&self) -> QueryState {
        self.query.state()
    }

    /// Returns the current result, if the query has one.
    pub fn result(&self) -> Option<ResultSet> {
        self.query.state().into_result()
    }

    /// Attaches a listener, invoked after each change of the result.
    pub fn on_change<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&ChangeSet) + Send + Sync + 'static,
    {
        self.query.add_listener(callback)
    }

    /// Detaches one listener. Returns false if it was not attached.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.query.remove_listener(id)
    }

    /// Rebinds the query to new parameters.
    ///
    /// This counts as a new query: it re-executes immediately and listeners
    /// are notified even when the result equals the previous one. On a
    /// binding error the state becomes `Failed` and the error is returned.
    pub fn rebind(&self, params: Params) -> Result<(), ExecError> {
        self.manager.rebind(&self.query, params)
    }

    /// Returns a receiver that observes every state transition.
    pub fn watch(&self) -> watch::Receiver<QueryState> {
        self.query.watch()
    }

    /// Waits until the query leaves the loading state and returns that state.
    pub async fn ready(&self) -> QueryState {
        let mut receiver = self.query.watch();
        let state = match receiver.wait_for(|s| !s.is_loading()).await {
            Ok(state) => state.clone(),
            Err(_) => self.query.state(),
        };
        state
    }

    /// Returns false once the subscription has been torn down.
    pub fn is_active(&self) -> bool {
        self.query.is_active()
    }

    /// Stops notifications and detaches all listeners. Idempotent.
    pub fn unsubscribe(&self) {
        if self.query.deactivate() {
            self.manager.unsubscribe(self.query.id());
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id())
            .field("query", &self.descriptor().to_string())
            .field("active", &self.is_active())
            .finish()
    }
}
