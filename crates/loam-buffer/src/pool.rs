//! Buffer pool manager.

use crate::disk::DiskManager;
use crate::frame::{BufferFrame, FrameId};
use crate::page_table::PageTable;
use crate::replacer::{LruReplacer, Replacer};
use loam_common::page::{PageId, PAGE_SIZE};
use loam_common::{LoamError, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use sysinfo::System;

/// Configuration for the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of frames in the pool.
    pub num_frames: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self { num_frames: 1024 }
    }
}

/// Buffer pool manager.
///
/// Manages a fixed-size pool of page frames backed by a disk manager:
/// - Page ID to frame ID mapping (sharded page table)
/// - Free frame list for new pages
/// - Least-recently-unpinned replacement with write-back of dirty victims
/// - Pin counting for concurrent access
///
/// Callers follow the pin discipline: every `new_page`/`fetch_page` must be
/// paired with exactly one `unpin_page`, dirty iff the page bytes changed.
pub struct BufferPoolManager {
    /// Configuration.
    config: BufferPoolConfig,
    /// Array of buffer frames.
    frames: Vec<BufferFrame>,
    /// Page ID to frame ID mapping.
    page_table: PageTable,
    /// List of free frame IDs.
    free_list: Mutex<Vec<FrameId>>,
    /// Page replacement policy.
    replacer: LruReplacer,
    /// Backing storage for page faults and write-back.
    disk: Arc<DiskManager>,
}

impl BufferPoolManager {
    /// Creates a new buffer pool over the given disk manager.
    pub fn new(config: BufferPoolConfig, disk: Arc<DiskManager>) -> Self {
        let num_frames = config.num_frames;

        let frames: Vec<_> = (0..num_frames)
            .map(|i| BufferFrame::new(FrameId(i as u32)))
            .collect();

        // All frames start in the free list
        let free_list: Vec<_> = (0..num_frames).map(|i| FrameId(i as u32)).collect();

        Self {
            config,
            frames,
            page_table: PageTable::new(num_frames),
            free_list: Mutex::new(free_list),
            replacer: LruReplacer::new(num_frames),
            disk,
        }
    }

    /// Creates a buffer pool sized to 25% of available system RAM.
    ///
    /// Minimum 1,000 frames so caching stays useful on low-memory systems.
    pub fn auto_sized(disk: Arc<DiskManager>) -> Self {
        let mut sys = System::new_all();
        sys.refresh_memory();

        let available_bytes = sys.available_memory() as usize;
        let target_bytes = available_bytes / 4;
        let num_frames = (target_bytes / PAGE_SIZE).max(1_000);

        Self::new(BufferPoolConfig { num_frames }, disk)
    }

    /// Returns the number of frames in the pool.
    pub fn num_frames(&self) -> usize {
        self.config.num_frames
    }

    /// Returns the number of free frames.
    pub fn free_count(&self) -> usize {
        self.free_list.lock().len()
    }

    /// Returns the number of pages currently in the pool.
    pub fn page_count(&self) -> usize {
        self.page_table.len()
    }

    /// Checks if a page is in the buffer pool.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.page_table.contains(page_id)
    }

    /// Allocates a fresh page and pins it.
    ///
    /// The page is zero-filled and registered with the disk manager. Fails
    /// with `BufferPoolFull` when every frame is pinned.
    pub fn new_page(&self) -> Result<(PageId, &BufferFrame)> {
        let frame_id = self.allocate_frame()?;

        let page_id = match self.disk.allocate_page() {
            Ok(page_id) => page_id,
            Err(e) => {
                // Return the frame so it is not leaked
                self.free_list.lock().push(frame_id);
                return Err(e);
            }
        };

        let frame = &self.frames[frame_id.0 as usize];
        frame.reset();
        frame.set_page_id(Some(page_id));
        frame.pin();

        self.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);

        Ok((page_id, frame))
    }

    /// Fetches an existing page and pins it.
    ///
    /// Faults the page in from disk on a miss, evicting a victim frame if
    /// the pool is full.
    pub fn fetch_page(&self, page_id: PageId) -> Result<&BufferFrame> {
        if let Some(frame_id) = self.page_table.get(page_id) {
            let frame = &self.frames[frame_id.0 as usize];
            frame.pin();
            self.replacer.pin(frame_id);
            return Ok(frame);
        }

        let data = self.disk.read_page(page_id)?;
        let frame_id = self.allocate_frame()?;

        let frame = &self.frames[frame_id.0 as usize];
        frame.reset();
        frame.set_page_id(Some(page_id));
        frame.copy_from(&data);
        frame.pin();

        self.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);

        Ok(frame)
    }

    /// Releases one pin on a page, optionally marking it dirty.
    ///
    /// The page becomes evictable once its pin count drops to zero.
    /// Returns false if the page is not in the pool.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        if let Some(frame_id) = self.page_table.get(page_id) {
            let frame = &self.frames[frame_id.0 as usize];

            if is_dirty {
                frame.set_dirty(true);
            }

            if frame.unpin() == 0 {
                self.replacer.unpin(frame_id);
            }
            return true;
        }
        false
    }

    /// Writes a page back to disk if it is dirty.
    ///
    /// Returns true if the page was flushed.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        if let Some(frame_id) = self.page_table.get(page_id) {
            let frame = &self.frames[frame_id.0 as usize];
            if frame.is_dirty() {
                let data = frame.read_data();
                self.disk.write_page(page_id, &data)?;
                frame.set_dirty(false);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Flushes every dirty page in the pool.
    pub fn flush_all(&self) -> Result<()> {
        for frame in &self.frames {
            if let Some(page_id) = frame.page_id() {
                self.flush_page(page_id)?;
            }
        }
        Ok(())
    }

    /// Picks a frame for a new page: free list first, then eviction.
    ///
    /// Dirty victims are written back before the frame is handed out.
    fn allocate_frame(&self) -> Result<FrameId> {
        {
            let mut free_list = self.free_list.lock();
            if let Some(frame_id) = free_list.pop() {
                return Ok(frame_id);
            }
        }

        let victim_id = self.replacer.victim().ok_or(LoamError::BufferPoolFull)?;
        let frame = &self.frames[victim_id.0 as usize];

        if frame.is_dirty() {
            if let Some(old_page_id) = frame.page_id() {
                let data = frame.read_data();
                self.disk.write_page(old_page_id, &data)?;
            }
        }

        if let Some(old_page_id) = frame.page_id() {
            self.page_table.remove(old_page_id);
        }

        Ok(victim_id)
    }
}
