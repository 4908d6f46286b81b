//! Page identity and size constants for LoamDB storage.

use serde::{Deserialize, Serialize};

/// Size of a database page in bytes (4 KiB).
pub const PAGE_SIZE: usize = 4096;

/// Identifier of a page within the data file.
///
/// Page ids are dense, starting at 0; `PageId::INVALID` is the reserved
/// sentinel meaning "no such page" and terminates page chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(pub u32);

impl PageId {
    /// Invalid page id.
    pub const INVALID: PageId = PageId(u32::MAX);

    /// Creates a new page id.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns true if this is a valid page id.
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
