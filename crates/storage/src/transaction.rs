//! Single-table write transactions.
//!
//! A mutation is applied row by row inside a `Transaction`. If any row fails a
//! constraint the transaction is rolled back and the table is left untouched;
//! otherwise it commits and the table revision advances exactly once.

use crate::error::Result;
use crate::journal::Journal;
use crate::mutation::RowChange;
use crate::row_store::RowStore;
use rivulet_core::{Row, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

static NEXT_TX_ID: AtomicU64 = AtomicU64::new(1);

/// Transaction ID type.
pub type TransactionId = u64;

/// A write transaction over one table.
pub struct Transaction<'a> {
    id: TransactionId,
    store: &'a mut RowStore,
    journal: Journal,
}

impl<'a> Transaction<'a> {
    /// Starts a transaction on the given table.
    pub fn begin(store: &'a mut RowStore) -> Self {
        let id = NEXT_TX_ID.fetch_add(1, Ordering::Relaxed);
        trace!(tx = id, table = store.schema().name(), "begin");
        Self {
            id,
            store,
            journal: Journal::new(),
        }
    }

    /// Returns the transaction ID.
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Read access to the table as modified so far.
    pub fn store(&self) -> &RowStore {
        self.store
    }

    /// Inserts a row.
    pub fn insert(&mut self, row: Row) -> Result<()> {
        let row = self.store.insert(row)?;
        let key = self.store.key_of(&row);
        self.journal.record_insert(key, row);
        Ok(())
    }

    /// Replaces the row stored under `key`.
    pub fn update(&mut self, key: &Value, new_row: Row) -> Result<()> {
        let (old, new) = self.store.update(key, new_row)?;
        let new_key = self.store.key_of(&new);
        self.journal.record_update(key.clone(), new_key, old, new);
        Ok(())
    }

    /// Deletes the row stored under `key`.
    pub fn delete(&mut self, key: &Value) -> Result<()> {
        let row = self.store.delete(key)?;
        self.journal.record_delete(key.clone(), row);
        Ok(())
    }

    /// Commits the transaction, returning the applied changes and the table
    /// revision. The revision only advances when something changed.
    pub fn commit(self) -> (Vec<RowChange>, u64) {
        let revision = if self.journal.is_empty() {
            self.store.revision()
        } else {
            self.store.bump_revision()
        };
        trace!(tx = self.id, changes = self.journal.len(), revision, "commit");
        (self.journal.commit(), revision)
    }

    /// Rolls back every change made by this transaction.
    pub fn rollback(self) {
        trace!(tx = self.id, changes = self.journal.len(), "rollback");
        self.journal.rollback(self.store);
    }

    /// Runs `body` inside a transaction, committing on success and rolling
    /// back on error.
    pub fn run<F>(store: &'a mut RowStore, body: F) -> Result<(Vec<RowChange>, u64)>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<()>,
    {
        let mut tx = Transaction::begin(store);
        match body(&mut tx) {
            Ok(()) => Ok(tx.commit()),
            Err(err) => {
                tx.rollback();
                Err(err)
            }
        }
    }
}
