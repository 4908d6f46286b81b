//! Error types for LoamDB.

use crate::page::PageId;
use crate::rid::Rid;
use thiserror::Error;

/// Result type alias using LoamError.
pub type Result<T> = std::result::Result<T, LoamError>;

/// Errors that can occur in LoamDB operations.
///
/// Legitimate runtime failures are surfaced here; programming errors
/// (inserting a zero-size tuple, double mark-delete, operating on a
/// wrong-page rid) are asserted instead.
#[derive(Debug, Error)]
pub enum LoamError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Storage errors
    #[error("page not found: {page_id}")]
    PageNotFound { page_id: PageId },

    #[error("buffer pool full, unable to allocate frame")]
    BufferPoolFull,

    #[error("tuple of {size} bytes can never fit a page (max {max})")]
    TupleTooLarge { size: usize, max: usize },

    #[error("tuple of {size} bytes does not fit in the page holding {rid}")]
    DoesNotFit { rid: Rid, size: usize },

    #[error("invalid rid: {0}")]
    InvalidRid(Rid),

    // WAL errors
    #[error("WAL corrupted at offset {offset}: {reason}")]
    WalCorrupted { offset: u64, reason: String },

    // Internal errors
    #[error("internal error: {0}")]
    Internal(String),
}
