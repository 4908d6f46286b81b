//! Write-Ahead Log (WAL) for LoamDB.
//!
//! Page mutations append a log record here before their bytes become
//! visible; the returned LSN is stamped into the page header so log and
//! page state can be ordered during recovery.

pub mod manager;
pub mod reader;
pub mod record;
pub mod txn;

pub use manager::LogManager;
pub use reader::read_log_file;
pub use record::{LogRecord, LogRecordKind, Lsn};
pub use txn::{IsolationLevel, TransactionContext};
