//! Residency map: which frame, if any, holds a given page.

use crate::frame::FrameId;
use loam_common::page::PageId;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Shard count; a power of two so the shard pick is a mask.
const SHARD_COUNT: usize = 16;

/// Sharded map from page id to the frame caching that page.
///
/// Each shard is an independent `RwLock<HashMap>`, so lookups for
/// distinct pages rarely contend and hot-path hits take a single shard
/// read lock. Sequential page ids spread round-robin across shards.
pub struct PageTable {
    shards: Vec<RwLock<HashMap<u32, FrameId>>>,
}

impl PageTable {
    /// Creates a table sized for roughly `capacity` resident pages.
    pub fn new(capacity: usize) -> Self {
        let per_shard = capacity.div_ceil(SHARD_COUNT);
        let shards = (0..SHARD_COUNT)
            .map(|_| RwLock::new(HashMap::with_capacity(per_shard)))
            .collect();
        Self { shards }
    }

    fn shard(&self, page_id: PageId) -> &RwLock<HashMap<u32, FrameId>> {
        &self.shards[page_id.0 as usize & (SHARD_COUNT - 1)]
    }

    /// Looks up the frame caching `page_id`.
    pub fn get(&self, page_id: PageId) -> Option<FrameId> {
        self.shard(page_id).read().get(&page_id.0).copied()
    }

    /// Records that `page_id` now lives in `frame_id`, replacing any
    /// previous mapping for that page.
    pub fn insert(&self, page_id: PageId, frame_id: FrameId) {
        self.shard(page_id).write().insert(page_id.0, frame_id);
    }

    /// Drops the mapping for `page_id`, returning the frame it named.
    pub fn remove(&self, page_id: PageId) -> Option<FrameId> {
        self.shard(page_id).write().remove(&page_id.0)
    }

    /// True if the page is resident.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.shard(page_id).read().contains_key(&page_id.0)
    }

    /// Number of resident pages.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    /// True when no page is resident.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
