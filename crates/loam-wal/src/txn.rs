//! Transaction context consumed by the storage layer.

use crate::record::Lsn;
use std::sync::atomic::{AtomicU32, Ordering};

/// Isolation level hint carried by a transaction.
///
/// The storage core does not enforce isolation; the hint tells readers how
/// to treat marked-deleted tuples (at read committed they are skipped).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// Per-transaction state the page layer needs while emitting log records.
///
/// Each mutation chains itself into the transaction's undo chain by reading
/// `prev_lsn`, appending a record that points at it, and storing the new
/// LSN back. The prev-LSN cell is atomic so contexts can be shared by
/// reference across the storage API.
#[derive(Debug)]
pub struct TransactionContext {
    /// Transaction ID.
    txn_id: u32,
    /// LSN of the last log record emitted by this transaction.
    prev_lsn: AtomicU32,
    /// Isolation level hint.
    isolation: IsolationLevel,
}

impl TransactionContext {
    /// Creates a context with the default isolation level.
    pub fn new(txn_id: u32) -> Self {
        Self::with_isolation(txn_id, IsolationLevel::default())
    }

    /// Creates a context with an explicit isolation level.
    pub fn with_isolation(txn_id: u32, isolation: IsolationLevel) -> Self {
        Self {
            txn_id,
            prev_lsn: AtomicU32::new(Lsn::INVALID.0),
            isolation,
        }
    }

    /// Returns the transaction ID.
    pub fn txn_id(&self) -> u32 {
        self.txn_id
    }

    /// Returns the LSN of this transaction's most recent log record.
    pub fn prev_lsn(&self) -> Lsn {
        Lsn(self.prev_lsn.load(Ordering::Acquire))
    }

    /// Records the LSN of a freshly appended log record.
    pub fn set_prev_lsn(&self, lsn: Lsn) {
        self.prev_lsn.store(lsn.0, Ordering::Release);
    }

    /// Returns the isolation level hint.
    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }
}
