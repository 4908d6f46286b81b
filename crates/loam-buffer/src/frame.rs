//! Page frames, the unit of memory the buffer pool manages.

use loam_common::page::{PageId, PAGE_SIZE};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Occupant value of a frame holding no page.
const VACANT: u32 = u32::MAX;

/// Position of a frame within the pool's frame array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u32);

/// One page-sized slot of pool memory.
///
/// A frame couples the page image with the bookkeeping the pool needs to
/// manage it: which page currently occupies the frame, how many callers
/// hold it pinned, and whether the image has diverged from disk. The
/// image's `RwLock` doubles as the page latch: readers take it shared,
/// mutations take it exclusive.
pub struct BufferFrame {
    id: FrameId,
    /// Raw id of the occupying page; VACANT when the frame is free.
    occupant: AtomicU32,
    /// Outstanding pins. A pinned frame must not be evicted.
    pins: AtomicU32,
    /// True once the image was modified after loading.
    dirty: AtomicBool,
    /// The page image.
    image: RwLock<Box<[u8; PAGE_SIZE]>>,
}

impl BufferFrame {
    /// Creates a vacant, zero-filled frame.
    pub fn new(id: FrameId) -> Self {
        Self {
            id,
            occupant: AtomicU32::new(VACANT),
            pins: AtomicU32::new(0),
            dirty: AtomicBool::new(false),
            image: RwLock::new(Box::new([0u8; PAGE_SIZE])),
        }
    }

    /// This frame's position in the pool.
    pub fn frame_id(&self) -> FrameId {
        self.id
    }

    /// Takes the shared latch on the page image.
    #[inline]
    pub fn read_data(&self) -> RwLockReadGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.image.read()
    }

    /// Takes the exclusive latch on the page image.
    #[inline]
    pub fn write_data(&self) -> RwLockWriteGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.image.write()
    }

    /// Overwrites the front of the image with `src`.
    pub fn copy_from(&self, src: &[u8]) {
        let prefix = PAGE_SIZE.min(src.len());
        self.image.write()[..prefix].copy_from_slice(&src[..prefix]);
    }

    /// The page occupying this frame, if any.
    pub fn page_id(&self) -> Option<PageId> {
        let raw = self.occupant.load(Ordering::Acquire);
        (raw != VACANT).then_some(PageId(raw))
    }

    /// Records which page occupies this frame.
    pub fn set_page_id(&self, page_id: Option<PageId>) {
        self.occupant
            .store(page_id.map_or(VACANT, |p| p.0), Ordering::Release);
    }

    /// Adds a pin.
    #[inline]
    pub fn pin(&self) {
        self.pins.fetch_add(1, Ordering::AcqRel);
    }

    /// Releases one pin and returns the count that remains.
    ///
    /// A frame already at zero stays at zero.
    pub fn unpin(&self) -> u32 {
        let mut observed = self.pins.load(Ordering::Acquire);
        while observed > 0 {
            match self.pins.compare_exchange_weak(
                observed,
                observed - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return observed - 1,
                Err(current) => observed = current,
            }
        }
        0
    }

    /// Current number of pins.
    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pins.load(Ordering::Acquire)
    }

    /// True while at least one caller holds the frame.
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    /// True once the image must be written back before reuse.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Flags or clears divergence from the on-disk copy.
    #[inline]
    pub fn set_dirty(&self, dirty: bool) {
        self.dirty.store(dirty, Ordering::Release);
    }

    /// Returns the frame to its vacant state, zeroing the image.
    pub fn reset(&self) {
        self.occupant.store(VACANT, Ordering::Release);
        self.pins.store(0, Ordering::Release);
        self.dirty.store(false, Ordering::Release);
        self.image.write().fill(0);
    }
}
