//! Record identifiers.

use crate::page::PageId;
use serde::{Deserialize, Serialize};

/// Unique identifier for a record within the database.
///
/// Combines the page holding the record with the slot number inside that
/// page. A rid stays stable for the lifetime of the record, including while
/// the record is marked deleted; only apply-delete invalidates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rid {
    /// Page containing this record.
    pub page_id: PageId,
    /// Slot number within the page.
    pub slot_id: u32,
}

impl Rid {
    /// Invalid rid, used to signal "no record" (e.g. end of iteration).
    pub const INVALID: Rid = Rid {
        page_id: PageId::INVALID,
        slot_id: 0,
    };

    /// Creates a new rid.
    pub fn new(page_id: PageId, slot_id: u32) -> Self {
        Self { page_id, slot_id }
    }

    /// Returns true if this rid refers to a real page.
    pub fn is_valid(&self) -> bool {
        self.page_id.is_valid()
    }
}

impl std::fmt::Display for Rid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.page_id, self.slot_id)
    }
}
