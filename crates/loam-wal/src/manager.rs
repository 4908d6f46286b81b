//! Thread-safe log manager for appending log records.

use crate::record::{LogRecord, Lsn};
use crate::txn::TransactionContext;
use bytes::BytesMut;
use loam_common::Result;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

/// Thread-safe log manager.
///
/// Assigns monotonically increasing LSNs and keeps the appended records
/// both as structured values (for inspection and undo chains) and as
/// serialized bytes in a log buffer. With a backing file configured,
/// `flush` drains the buffer to disk; without one the manager runs fully
/// in memory, which is what tests and bulk loads use.
pub struct LogManager {
    /// Next LSN to assign.
    next_lsn: AtomicU32,
    /// Next transaction ID to assign.
    next_txn_id: AtomicU32,
    /// Last LSN durably flushed to the log file.
    flushed_lsn: AtomicU32,
    /// Append state.
    inner: Mutex<LogInner>,
    /// Enable fsync on flush.
    fsync_enabled: bool,
}

struct LogInner {
    /// All appended records, in LSN order.
    records: Vec<LogRecord>,
    /// Serialized records not yet flushed.
    buffer: BytesMut,
    /// Backing log file, if any.
    file: Option<File>,
}

impl LogManager {
    /// Creates an in-memory log manager.
    pub fn new() -> Self {
        Self {
            next_lsn: AtomicU32::new(Lsn::FIRST.0),
            next_txn_id: AtomicU32::new(1),
            flushed_lsn: AtomicU32::new(Lsn::INVALID.0),
            inner: Mutex::new(LogInner {
                records: Vec::new(),
                buffer: BytesMut::new(),
                file: None,
            }),
            fsync_enabled: false,
        }
    }

    /// Creates a log manager backed by a log file.
    pub fn with_file(path: &Path, fsync_enabled: bool) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        let mut manager = Self::new();
        manager.inner.get_mut().file = Some(file);
        manager.fsync_enabled = fsync_enabled;
        Ok(manager)
    }

    /// Returns the next LSN that will be assigned.
    pub fn next_lsn(&self) -> Lsn {
        Lsn(self.next_lsn.load(Ordering::SeqCst))
    }

    /// Returns the last LSN flushed to the log file.
    pub fn flushed_lsn(&self) -> Lsn {
        Lsn(self.flushed_lsn.load(Ordering::SeqCst))
    }

    /// Allocates a new transaction ID.
    pub fn allocate_txn_id(&self) -> u32 {
        self.next_txn_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Appends a log record and returns its assigned LSN.
    ///
    /// The record is stamped with the LSN, serialized into the log buffer,
    /// and retained. Appends never fail; durability is deferred to `flush`.
    pub fn append_log_record(&self, mut record: LogRecord) -> Lsn {
        let mut inner = self.inner.lock();

        // Assigned under the lock so buffer order matches LSN order
        let lsn = Lsn(self.next_lsn.fetch_add(1, Ordering::SeqCst));
        record.lsn = lsn;

        let serialized = record.serialize();
        inner.buffer.extend_from_slice(&serialized);
        inner.records.push(record);

        lsn
    }

    /// Flushes buffered records to the log file.
    ///
    /// Without a backing file the buffer is simply drained.
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.inner.lock();

        if inner.buffer.is_empty() {
            return Ok(());
        }

        let pending = inner.buffer.split().freeze();
        if let Some(ref mut file) = inner.file {
            file.write_all(&pending)?;
            if self.fsync_enabled {
                file.sync_all()?;
            }
        }

        let flushed = self.next_lsn.load(Ordering::SeqCst) - 1;
        self.flushed_lsn.store(flushed, Ordering::SeqCst);

        Ok(())
    }

    /// Logs a transaction begin and starts its prev-LSN chain.
    pub fn log_begin(&self, txn: &TransactionContext) -> Lsn {
        let lsn = self.append_log_record(LogRecord::begin(txn.txn_id()));
        txn.set_prev_lsn(lsn);
        lsn
    }

    /// Logs a transaction commit.
    pub fn log_commit(&self, txn: &TransactionContext) -> Lsn {
        let lsn = self.append_log_record(LogRecord::commit(txn.txn_id(), txn.prev_lsn()));
        txn.set_prev_lsn(lsn);
        lsn
    }

    /// Logs a transaction abort.
    pub fn log_abort(&self, txn: &TransactionContext) -> Lsn {
        let lsn = self.append_log_record(LogRecord::abort(txn.txn_id(), txn.prev_lsn()));
        txn.set_prev_lsn(lsn);
        lsn
    }

    /// Returns the most recently appended record.
    pub fn last_record(&self) -> Option<LogRecord> {
        self.inner.lock().records.last().cloned()
    }

    /// Returns the number of appended records.
    pub fn record_count(&self) -> usize {
        self.inner.lock().records.len()
    }

    /// Returns a copy of all appended records, in LSN order.
    pub fn records(&self) -> Vec<LogRecord> {
        self.inner.lock().records.clone()
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}
