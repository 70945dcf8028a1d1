//! The append-only mutation event log.
//!
//! Every committed mutation that touched at least one row becomes one
//! `EventLogEntry` with a strictly increasing sequence number. The log feeds
//! the reactive layer and effect adapters, and re-applying it in order to an
//! empty store reproduces the live store exactly.

use crate::error::{ReplayError, Result};
use crate::mutation::{MutationKind, MutationOp, MutationOutcome, RowChange};
use crate::store::Store;
use rivulet_core::schema::Table;
use rivulet_core::Value;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Sequence number of a log entry. The first entry is 1.
pub type Sequence = u64;

/// Immutable record of one committed mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub sequence: Sequence,
    pub table: String,
    pub kind: MutationKind,
    /// Before/after images of every touched row, in application order.
    pub changes: Vec<RowChange>,
    /// Table revision produced by this mutation.
    pub revision: u64,
}

impl EventLogEntry {
    /// Primary keys of the touched rows, in application order.
    pub fn affected_keys(&self) -> Vec<Value> {
        self.changes.iter().map(|c| c.key.clone()).collect()
    }

    /// The store operation that re-applies this entry.
    pub fn to_op(&self) -> MutationOp {
        match self.kind {
            MutationKind::Insert => MutationOp::Insert {
                rows: self.changes.iter().filter_map(|c| c.after.clone()).collect(),
            },
            MutationKind::Update => MutationOp::Replace {
                rows: self
                    .changes
                    .iter()
                    .filter_map(|c| c.after.clone().map(|row| (c.key.clone(), row)))
                    .collect(),
            },
            MutationKind::Delete => MutationOp::DeleteByKey {
                keys: self.affected_keys(),
            },
        }
    }
}

/// Append-only log of committed mutations.
#[derive(Debug)]
pub struct EventLog {
    entries: VecDeque<Arc<EventLogEntry>>,
    next_sequence: Sequence,
}

impl Default for EventLog {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
            next_sequence: 1,
        }
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a committed outcome and assigns it the next sequence number.
    pub fn append(&mut self, outcome: &MutationOutcome) -> Arc<EventLogEntry> {
        let entry = Arc::new(EventLogEntry {
            sequence: self.next_sequence,
            table: outcome.table.clone(),
            kind: outcome.kind,
            changes: outcome.changes.clone(),
            revision: outcome.revision,
        });
        self.next_sequence += 1;
        self.entries.push_back(entry.clone());
        entry
    }

    /// Sequence of the newest entry ever appended; 0 if none.
    pub fn last_sequence(&self) -> Sequence {
        self.next_sequence - 1
    }

    /// Sequence of the oldest retained entry.
    pub fn first_retained(&self) -> Option<Sequence> {
        self.entries.front().map(|e| e.sequence)
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up a retained entry.
    pub fn get(&self, sequence: Sequence) -> Option<Arc<EventLogEntry>> {
        let front = self.first_retained()?;
        let offset = sequence.checked_sub(front)?;
        self.entries.get(offset as usize).cloned()
    }

    /// Retained entries with a sequence strictly greater than `after`, in order.
    pub fn entries_since(&self, after: Sequence) -> Vec<Arc<EventLogEntry>> {
        self.entries
            .iter()
            .filter(|e| e.sequence > after)
            .cloned()
            .collect()
    }

    /// Iterates all retained entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<EventLogEntry>> {
        self.entries.iter()
    }

    /// Discards entries with a sequence up to and including `through`.
    pub fn compact_through(&mut self, through: Sequence) -> usize {
        let mut dropped = 0;
        while self.entries.front().is_some_and(|e| e.sequence <= through) {
            self.entries.pop_front();
            dropped += 1;
        }
        if dropped > 0 {
            debug!(through, dropped, "compacted event log");
        }
        dropped
    }

    /// Forgets every entry and restarts numbering at 1.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_sequence = 1;
    }

    /// Rebuilds a store by re-applying entries, in order, to an empty store
    /// holding the given tables. `upto` stops after that sequence; `None`
    /// replays everything.
    pub fn replay(
        &self,
        schemas: &[Arc<Table>],
        upto: Option<Sequence>,
    ) -> std::result::Result<Store, ReplayError> {
        let last = self.last_sequence();
        let upto = upto.unwrap_or(last);
        if upto > last {
            return Err(ReplayError::BeyondEnd {
                requested: upto,
                last,
            });
        }
        if upto > 0 {
            match self.first_retained() {
                Some(1) => {}
                Some(first_retained) => return Err(ReplayError::Compacted { first_retained }),
                None => {
                    return Err(ReplayError::Compacted {
                        first_retained: self.next_sequence,
                    })
                }
            }
        }

        let mut store = Store::with_tables(schemas);
        for entry in self.entries.iter().take_while(|e| e.sequence <= upto) {
            store
                .apply_entry(entry)
                .map_err(|source| ReplayError::Apply {
                    sequence: entry.sequence,
                    source,
                })?;
        }
        Ok(store)
    }
}

impl Store {
    /// Re-applies one logged mutation.
    pub fn apply_entry(&mut self, entry: &EventLogEntry) -> Result<MutationOutcome> {
        self.apply(&entry.table, entry.to_op())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Condition, Filter};
    use crate::mutation::Assignment;
    use rivulet_core::schema::TableBuilder;
    use rivulet_core::{CompareOp, DataType, Row};

    fn todos() -> Arc<Table> {
        Arc::new(
            TableBuilder::new("todos")
                .unwrap()
                .add_column("id", DataType::Int)
                .unwrap()
                .add_column("title", DataType::Text)
                .unwrap()
                .add_column("done", DataType::Boolean)
                .unwrap()
                .add_primary_key("id")
                .unwrap()
                .build()
                .unwrap(),
        )
    }

    fn todo(id: i64, title: &str, done: bool) -> Row {
        Row::new(vec![Value::Int(id), Value::from(title), Value::Boolean(done)])
    }

    fn id_is(id: i64) -> Filter {
        Filter::new(vec![Condition::new(0, DataType::Int, CompareOp::Eq, Value::Int(id))])
    }

    /// Applies ops to a live store, logging each non-empty outcome.
    fn run(ops: Vec<MutationOp>) -> (Store, EventLog, Vec<Store>) {
        let mut store = Store::with_tables(&[todos()]);
        let mut log = EventLog::new();
        let mut history = Vec::new();
        for op in ops {
            let outcome = store.apply("todos", op).unwrap();
            if !outcome.is_empty() {
                log.append(&outcome);
                history.push(store.clone());
            }
        }
        (store, log, history)
    }

    fn sample_ops() -> Vec<MutationOp> {
        vec![
            MutationOp::Insert {
                rows: vec![todo(1, "write", false), todo(2, "test", false)],
            },
            MutationOp::Update {
                filter: id_is(1),
                assignments: vec![Assignment::new(2, Value::Boolean(true))],
            },
            MutationOp::Delete { filter: id_is(42) },
            MutationOp::Update {
                filter: id_is(2),
                assignments: vec![Assignment::new(0, Value::Int(20))],
            },
            MutationOp::Delete { filter: id_is(1) },
        ]
    }

    #[test]
    fn test_sequences_are_dense_and_increasing() {
        let (_, log, _) = run(sample_ops());
        let sequences: Vec<_> = log.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4]);
        assert_eq!(log.last_sequence(), 4);
        assert_eq!(log.get(3).unwrap().kind, MutationKind::Update);
        assert!(log.get(9).is_none());
    }

    #[test]
    fn test_entries_since() {
        let (_, log, _) = run(sample_ops());
        let tail: Vec<_> = log.entries_since(2).iter().map(|e| e.sequence).collect();
        assert_eq!(tail, vec![3, 4]);
        assert!(log.entries_since(4).is_empty());
    }

    #[test]
    fn test_replay_matches_live_store() {
        let (live, log, history) = run(sample_ops());
        assert_eq!(log.replay(&[todos()], None).unwrap(), live);
        for (i, expected) in history.iter().enumerate() {
            let replayed = log.replay(&[todos()], Some(i as u64 + 1)).unwrap();
            assert_eq!(&replayed, expected);
        }
        assert_eq!(log.replay(&[todos()], Some(0)).unwrap(), Store::with_tables(&[todos()]));
    }

    #[test]
    fn test_replay_of_rekeyed_update() {
        let (_, log, _) = run(sample_ops());
        let entry = log.get(3).unwrap();
        assert_eq!(entry.affected_keys(), vec![Value::Int(2)]);
        assert_eq!(entry.changes[0].after, Some(todo(20, "test", false)));
    }

    #[test]
    fn test_replay_beyond_end() {
        let (_, log, _) = run(sample_ops());
        assert_eq!(
            log.replay(&[todos()], Some(5)).unwrap_err(),
            ReplayError::BeyondEnd { requested: 5, last: 4 }
        );
    }

    #[test]
    fn test_replay_after_compaction_fails() {
        let (_, mut log, _) = run(sample_ops());
        assert_eq!(log.compact_through(2), 2);
        assert_eq!(log.first_retained(), Some(3));
        assert_eq!(
            log.replay(&[todos()], None).unwrap_err(),
            ReplayError::Compacted { first_retained: 3 }
        );
        // numbering continues after compaction
        assert_eq!(log.last_sequence(), 4);
    }

    #[test]
    fn test_entry_serializes() {
        let (_, log, _) = run(sample_ops());
        let entry = log.get(1).unwrap();
        let json = serde_json::to_string(&*entry).unwrap();
        assert!(json.contains("\"kind\":\"insert\""));
        assert!(json.contains("\"sequence\":1"));
        let back: EventLogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, *entry);
    }
}
