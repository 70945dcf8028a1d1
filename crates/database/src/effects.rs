//! Effect-adapter dispatch.
//!
//! Effect adapters consume committed event-log entries to mirror table data
//! somewhere else (a remote API, persistent storage). The dispatcher hands
//! each adapter every entry for the tables it cares about, in commit order,
//! over an unbounded channel, so a slow adapter never blocks a mutation.
//!
//! Delivery is at-least-once. An adapter may join late and catch up from any
//! retained sequence number. Acknowledgements drive log compaction under
//! `LogRetention::UntilAcknowledged`.

use crate::error::EffectError;
use parking_lot::Mutex;
use rivulet_storage::{EventLog, EventLogEntry, ReplayError, Sequence};
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Unique identifier for a registered adapter.
pub type AdapterId = u64;

/// Delivery progress of one adapter, shared with its stream.
#[derive(Debug, Default)]
struct Progress {
    /// Highest sequence the dispatcher has considered, delivered or skipped.
    seen: AtomicU64,
    /// Highest sequence handed to the channel.
    delivered: AtomicU64,
    /// Highest sequence the consumer acknowledged.
    acked: AtomicU64,
}

impl Progress {
    fn new(from: Sequence) -> Self {
        Self {
            seen: AtomicU64::new(from),
            delivered: AtomicU64::new(from),
            acked: AtomicU64::new(from),
        }
    }

    /// Everything up to the returned sequence is done with.
    ///
    /// Skipped entries count as done once every delivered entry is acknowledged.
    fn acknowledged(&self) -> Sequence {
        let seen = self.seen.load(Ordering::SeqCst);
        let delivered = self.delivered.load(Ordering::SeqCst);
        let acked = self.acked.load(Ordering::SeqCst);
        if acked >= delivered {
            seen.max(acked)
        } else {
            acked
        }
    }
}

struct Adapter {
    id: AdapterId,
    /// `None` receives every table.
    table: Option<String>,
    sender: mpsc::UnboundedSender<Arc<EventLogEntry>>,
    progress: Arc<Progress>,
}

impl Adapter {
    fn wants(&self, entry: &EventLogEntry) -> bool {
        self.table.as_deref().map_or(true, |t| t == entry.table)
    }
}

/// Fans committed entries out to effect adapters.
pub struct EffectDispatcher {
    adapters: Mutex<Vec<Adapter>>,
    log: Arc<Mutex<EventLog>>,
    next_id: AtomicU64,
    hook_retries: u32,
}

impl EffectDispatcher {
    /// Creates a dispatcher that catches adapters up from `log`.
    pub fn new(log: Arc<Mutex<EventLog>>, hook_retries: u32) -> Self {
        Self {
            adapters: Mutex::new(Vec::new()),
            log,
            next_id: AtomicU64::new(1),
            hook_retries,
        }
    }

    /// Registers a stream adapter.
    ///
    /// The stream first receives every retained entry after `from` (pass 0
    /// for the whole log), then each new entry as it commits. `table` limits
    /// delivery to one table; `None` receives all tables. Fails if entries
    /// after `from` were already compacted away.
    pub fn subscribe(
        self: &Arc<Self>,
        table: Option<&str>,
        from: Sequence,
    ) -> Result<EffectStream, ReplayError> {
        let mut adapters = self.adapters.lock();
        let (catch_up, last) = {
            let log = self.log.lock();
            let last = log.last_sequence();
            if from < last {
                match log.first_retained() {
                    Some(first) if first <= from + 1 => {}
                    Some(first) => return Err(ReplayError::Compacted { first_retained: first }),
                    None => return Err(ReplayError::Compacted { first_retained: last + 1 }),
                }
            }
            (log.entries_since(from), last)
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        let progress = Arc::new(Progress::new(from));
        let adapter = Adapter {
            id,
            table: table.map(str::to_string),
            sender,
            progress: progress.clone(),
        };
        let mut pending = 0;
        for entry in catch_up {
            if adapter.wants(&entry) {
                progress.delivered.store(entry.sequence, Ordering::SeqCst);
                // receiver is alive: it is still in this scope
                let _ = adapter.sender.send(entry);
                pending += 1;
            }
        }
        progress.seen.store(last.max(from), Ordering::SeqCst);
        adapters.push(adapter);
        debug!(adapter = id, table = ?table, from, pending, "effect adapter registered");

        Ok(EffectStream {
            id,
            receiver,
            progress,
            dispatcher: Arc::downgrade(self),
        })
    }

    /// Registers a callback adapter driven by a spawned tokio task.
    ///
    /// The callback runs once per entry, in commit order. An `Err` redelivers
    /// the same entry, up to the configured retry count; after that the
    /// failure is logged and the entry is acknowledged anyway.
    pub fn register_hook<F, E>(
        self: &Arc<Self>,
        table: Option<&str>,
        from: Sequence,
        callback: F,
    ) -> Result<JoinHandle<()>, EffectError>
    where
        F: Fn(&EventLogEntry) -> Result<(), E> + Send + Sync + 'static,
        E: Display,
    {
        let runtime = Handle::try_current().map_err(|_| EffectError::NoRuntime)?;
        let mut stream = self.subscribe(table, from)?;
        let retries = self.hook_retries;
        let task = runtime.spawn(async move {
            while let Some(entry) = stream.recv().await {
                let mut attempt = 0;
                loop {
                    let failure = match callback(&*entry) {
                        Ok(()) => break,
                        Err(err) => err.to_string(),
                    };
                    if attempt >= retries {
                        warn!(
                            adapter = stream.id(),
                            sequence = entry.sequence,
                            error = %failure,
                            "effect hook failed, giving up on entry"
                        );
                        break;
                    }
                    attempt += 1;
                    warn!(
                        adapter = stream.id(),
                        sequence = entry.sequence,
                        attempt,
                        error = %failure,
                        "effect hook failed, redelivering"
                    );
                    tokio::task::yield_now().await;
                }
                stream.ack(entry.sequence);
            }
        });
        Ok(task)
    }

    /// Hands a committed entry to every interested adapter.
    pub fn dispatch(&self, entry: &Arc<EventLogEntry>) {
        let mut adapters = self.adapters.lock();
        adapters.retain(|adapter| {
            let progress = &adapter.progress;
            if entry.sequence <= progress.seen.load(Ordering::SeqCst) {
                // already delivered during catch-up
                return true;
            }
            if adapter.wants(entry) {
                progress.delivered.store(entry.sequence, Ordering::SeqCst);
            }
            progress.seen.store(entry.sequence, Ordering::SeqCst);
            if !adapter.wants(entry) {
                return true;
            }
            if adapter.sender.send(entry.clone()).is_err() {
                debug!(adapter = adapter.id, "effect adapter dropped");
                return false;
            }
            true
        });
    }

    /// Highest sequence acknowledged by every adapter, or `last` if there are none.
    pub fn acknowledged_through(&self, last: Sequence) -> Sequence {
        self.adapters
            .lock()
            .iter()
            .map(|a| a.progress.acknowledged())
            .min()
            .unwrap_or(last)
    }

    /// Returns the number of registered adapters.
    pub fn adapter_count(&self) -> usize {
        self.adapters.lock().len()
    }

    fn remove(&self, id: AdapterId) {
        self.adapters.lock().retain(|a| a.id != id);
    }

    /// Drops every adapter. Their streams end once drained.
    pub fn clear(&self) {
        self.adapters.lock().clear();
    }
}

impl std::fmt::Debug for EffectDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectDispatcher")
            .field("adapters", &self.adapter_count())
            .field("hook_retries", &self.hook_retries)
            .finish()
    }
}

/// Receiving end of a stream adapter.
///
/// Dropping the stream unregisters the adapter.
pub struct EffectStream {
    id: AdapterId,
    receiver: mpsc::UnboundedReceiver<Arc<EventLogEntry>>,
    progress: Arc<Progress>,
    dispatcher: Weak<EffectDispatcher>,
}

impl EffectStream {
    #[inline]
    pub fn id(&self) -> AdapterId {
        self.id
    }

    /// Waits for the next entry. Returns `None` once the dispatcher drops the adapter.
    pub async fn recv(&mut self) -> Option<Arc<EventLogEntry>> {
        self.receiver.recv().await
    }

    /// Returns the next entry if one is already queued.
    pub fn try_recv(&mut self) -> Option<Arc<EventLogEntry>> {
        self.receiver.try_recv().ok()
    }

    /// Marks every entry up to `sequence` as consumed.
    pub fn ack(&self, sequence: Sequence) {
        self.progress.acked.fetch_max(sequence, Ordering::SeqCst);
    }

    /// Returns the sequence this adapter is done with, counting entries
    /// filtered out by its table once everything delivered is acknowledged.
    pub fn acknowledged(&self) -> Sequence {
        self.progress.acknowledged()
    }
}

impl Drop for EffectStream {
    fn drop(&mut self) {
        if let Some(dispatcher) = self.dispatcher.upgrade() {
            dispatcher.remove(self.id);
        }
    }
}
