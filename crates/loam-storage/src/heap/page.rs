//! Heap page implementation using slotted page format.
//!
//! Page layout:
//! ```text
//! +----------------------------------+
//! | Header (24)                      |
//! |  page_id | lsn | prev | next     |
//! |  free_space_pointer | tuple_count|
//! +----------------------------------+
//! | Slot directory                   |  <- grows downward
//! |  (offset: u32, size: u32) each   |
//! +----------------------------------+
//! |          free space              |
//! +----------------------------------+
//! | Tuple payloads                   |  <- packed from the high end
//! +----------------------------------+
//! ```
//!
//! A slot size of 0 means the slot is free; the high bit of the size marks
//! the tuple as deleted. All header and slot fields are little-endian u32.
//!
//! The page operates on a borrowed frame buffer: callers pin the frame,
//! take its data latch (shared for reads, exclusive for mutations), and
//! hand the slice to these functions. Every mutation appends a log record
//! and stamps the returned LSN into the header before the latch is
//! released, so log and page state stay ordered.

use super::constants::{
    DELETE_MASK, HEADER_SIZE, OFFSET_FREE_SPACE_POINTER, OFFSET_LSN, OFFSET_NEXT_PAGE_ID,
    OFFSET_PAGE_ID, OFFSET_PREV_PAGE_ID, OFFSET_TUPLE_COUNT, SLOT_SIZE,
};
use crate::tuple::Tuple;
use bytes::Bytes;
use loam_common::page::PageId;
use loam_common::rid::Rid;
use loam_wal::{LogManager, LogRecord, Lsn, TransactionContext};

/// Result of an in-page update attempt.
#[derive(Debug)]
pub enum PageUpdate {
    /// The update succeeded; carries the pre-update tuple.
    Updated(Tuple),
    /// The new tuple does not fit in this page even after reclaiming the
    /// old payload. The caller decides between delete-and-insert elsewhere.
    DoesNotFit,
    /// The slot is out of range or free.
    InvalidSlot,
}

/// Slotted heap page operations over a borrowed page buffer.
pub struct HeapPage;

impl HeapPage {
    #[inline]
    fn read_u32(data: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ])
    }

    #[inline]
    fn write_u32(data: &mut [u8], offset: usize, value: u32) {
        data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    // =========================================================================
    // Header accessors
    // =========================================================================

    /// Returns the page's own id.
    #[inline]
    pub fn page_id(data: &[u8]) -> PageId {
        PageId(Self::read_u32(data, OFFSET_PAGE_ID))
    }

    /// Returns the LSN of the last log record emitted for this page.
    #[inline]
    pub fn lsn(data: &[u8]) -> Lsn {
        Lsn(Self::read_u32(data, OFFSET_LSN))
    }

    #[inline]
    fn set_lsn(data: &mut [u8], lsn: Lsn) {
        Self::write_u32(data, OFFSET_LSN, lsn.0);
    }

    /// Returns the previous page in the chain.
    #[inline]
    pub fn prev_page_id(data: &[u8]) -> PageId {
        PageId(Self::read_u32(data, OFFSET_PREV_PAGE_ID))
    }

    /// Sets the previous page in the chain.
    #[inline]
    pub fn set_prev_page_id(data: &mut [u8], page_id: PageId) {
        Self::write_u32(data, OFFSET_PREV_PAGE_ID, page_id.0);
    }

    /// Returns the next page in the chain.
    #[inline]
    pub fn next_page_id(data: &[u8]) -> PageId {
        PageId(Self::read_u32(data, OFFSET_NEXT_PAGE_ID))
    }

    /// Sets the next page in the chain.
    #[inline]
    pub fn set_next_page_id(data: &mut [u8], page_id: PageId) {
        Self::write_u32(data, OFFSET_NEXT_PAGE_ID, page_id.0);
    }

    #[inline]
    fn free_space_pointer(data: &[u8]) -> u32 {
        Self::read_u32(data, OFFSET_FREE_SPACE_POINTER)
    }

    #[inline]
    fn set_free_space_pointer(data: &mut [u8], pointer: u32) {
        Self::write_u32(data, OFFSET_FREE_SPACE_POINTER, pointer);
    }

    /// Returns the number of slots in the directory (free slots included).
    #[inline]
    pub fn tuple_count(data: &[u8]) -> u32 {
        Self::read_u32(data, OFFSET_TUPLE_COUNT)
    }

    #[inline]
    fn set_tuple_count(data: &mut [u8], count: u32) {
        Self::write_u32(data, OFFSET_TUPLE_COUNT, count);
    }

    /// Returns the contiguous free bytes between the slot directory and the
    /// packed payloads.
    #[inline]
    pub fn free_space(data: &[u8]) -> usize {
        Self::free_space_pointer(data) as usize
            - (HEADER_SIZE + Self::tuple_count(data) as usize * SLOT_SIZE)
    }

    // =========================================================================
    // Slot directory accessors
    // =========================================================================

    #[inline]
    fn slot_offset(data: &[u8], slot_id: u32) -> u32 {
        Self::read_u32(data, HEADER_SIZE + slot_id as usize * SLOT_SIZE)
    }

    #[inline]
    fn set_slot_offset(data: &mut [u8], slot_id: u32, offset: u32) {
        Self::write_u32(data, HEADER_SIZE + slot_id as usize * SLOT_SIZE, offset);
    }

    /// Raw slot size, delete bit included. 0 means the slot is free.
    #[inline]
    fn slot_size(data: &[u8], slot_id: u32) -> u32 {
        Self::read_u32(data, HEADER_SIZE + slot_id as usize * SLOT_SIZE + 4)
    }

    #[inline]
    fn set_slot_size(data: &mut [u8], slot_id: u32, size: u32) {
        Self::write_u32(data, HEADER_SIZE + slot_id as usize * SLOT_SIZE + 4, size);
    }

    #[inline]
    fn is_deleted(raw_size: u32) -> bool {
        raw_size & DELETE_MASK != 0
    }

    #[inline]
    fn is_live(raw_size: u32) -> bool {
        raw_size != 0 && !Self::is_deleted(raw_size)
    }

    // =========================================================================
    // WAL plumbing
    // =========================================================================

    /// Appends a log record for a mutation of this page and stamps the
    /// returned LSN into the header and the transaction's prev-LSN chain.
    ///
    /// A missing log manager disables logging entirely; a log manager
    /// without a transaction context is a programming error.
    fn emit_log(
        data: &mut [u8],
        txn: Option<&TransactionContext>,
        log: Option<&LogManager>,
        build: impl FnOnce(u32, Lsn) -> LogRecord,
    ) {
        let Some(log) = log else { return };
        let txn = txn.expect("transaction context required when logging is enabled");

        let record = build(txn.txn_id(), txn.prev_lsn());
        let lsn = log.append_log_record(record);
        Self::set_lsn(data, lsn);
        txn.set_prev_lsn(lsn);
    }

    // =========================================================================
    // Record operations
    // =========================================================================

    /// Formats the buffer as an empty tail page.
    pub fn init(data: &mut [u8], page_id: PageId, prev_page_id: PageId) {
        Self::write_u32(data, OFFSET_PAGE_ID, page_id.0);
        Self::write_u32(data, OFFSET_LSN, Lsn::INVALID.0);
        Self::write_u32(data, OFFSET_PREV_PAGE_ID, prev_page_id.0);
        Self::write_u32(data, OFFSET_NEXT_PAGE_ID, PageId::INVALID.0);
        Self::write_u32(data, OFFSET_FREE_SPACE_POINTER, data.len() as u32);
        Self::write_u32(data, OFFSET_TUPLE_COUNT, 0);
    }

    /// Inserts a tuple, reusing the first free slot if one exists.
    ///
    /// Returns the new rid, or None when the page is out of space (the
    /// caller treats this as "try the next page").
    pub fn insert_tuple(
        data: &mut [u8],
        tuple: &Tuple,
        txn: Option<&TransactionContext>,
        log: Option<&LogManager>,
    ) -> Option<Rid> {
        assert!(tuple.size() > 0, "cannot insert an empty tuple");

        if Self::free_space(data) < tuple.size() {
            return None;
        }

        // Reuse the first free slot, if any
        let tuple_count = Self::tuple_count(data);
        let mut slot_id = tuple_count;
        for i in 0..tuple_count {
            if Self::slot_size(data, i) == 0 {
                slot_id = i;
                break;
            }
        }

        // A new slot also needs room for its directory entry
        if slot_id == tuple_count && Self::free_space(data) < tuple.size() + SLOT_SIZE {
            return None;
        }

        let offset = Self::free_space_pointer(data) - tuple.size() as u32;
        Self::set_free_space_pointer(data, offset);
        data[offset as usize..offset as usize + tuple.size()].copy_from_slice(tuple.data());

        Self::set_slot_offset(data, slot_id, offset);
        Self::set_slot_size(data, slot_id, tuple.size() as u32);

        let rid = Rid::new(Self::page_id(data), slot_id);

        if slot_id == tuple_count {
            Self::set_tuple_count(data, tuple_count + 1);
        }

        let image = tuple.payload();
        Self::emit_log(data, txn, log, move |txn_id, prev_lsn| {
            LogRecord::insert(txn_id, prev_lsn, rid, image)
        });

        Some(rid)
    }

    /// Sets the delete bit on a live tuple.
    ///
    /// Returns false for an out-of-range or free slot. Marking an already
    /// marked tuple is a write-write conflict the caller's concurrency
    /// control must rule out, so it asserts.
    pub fn mark_delete(
        data: &mut [u8],
        rid: Rid,
        txn: Option<&TransactionContext>,
        log: Option<&LogManager>,
    ) -> bool {
        assert_eq!(rid.page_id, Self::page_id(data), "rid refers to another page");

        let slot_id = rid.slot_id;
        if slot_id >= Self::tuple_count(data) {
            return false;
        }

        let raw_size = Self::slot_size(data, slot_id);
        if raw_size == 0 {
            return false;
        }
        assert!(
            !Self::is_deleted(raw_size),
            "tuple is already marked deleted"
        );

        Self::emit_log(data, txn, log, |txn_id, prev_lsn| {
            LogRecord::mark_delete(txn_id, prev_lsn, rid)
        });

        Self::set_slot_size(data, slot_id, raw_size | DELETE_MASK);
        true
    }

    /// Replaces a live tuple's payload in place.
    ///
    /// The surviving payloads between the free space pointer and the old
    /// tuple are shifted to close (or open) the size difference, and every
    /// non-free slot whose payload sat at or below the old tuple's end is
    /// re-pointed - deliberately including the updated slot itself, which
    /// is how it acquires its new offset.
    pub fn update_tuple(
        data: &mut [u8],
        new_tuple: &Tuple,
        rid: Rid,
        txn: Option<&TransactionContext>,
        log: Option<&LogManager>,
    ) -> PageUpdate {
        assert_eq!(rid.page_id, Self::page_id(data), "rid refers to another page");
        assert!(new_tuple.size() > 0, "cannot update to an empty tuple");

        let slot_id = rid.slot_id;
        if slot_id >= Self::tuple_count(data) {
            return PageUpdate::InvalidSlot;
        }

        let raw_size = Self::slot_size(data, slot_id);
        if raw_size == 0 {
            return PageUpdate::InvalidSlot;
        }
        assert!(
            !Self::is_deleted(raw_size),
            "updating a tuple marked deleted"
        );

        let old_size = raw_size as usize;
        let new_size = new_tuple.size();
        if Self::free_space(data) + old_size < new_size {
            return PageUpdate::DoesNotFit;
        }

        let tuple_offset = Self::slot_offset(data, slot_id) as usize;
        let mut old_tuple = Tuple::from_payload(&data[tuple_offset..tuple_offset + old_size]);
        old_tuple.set_rid(rid);

        // Shift the payloads packed below the old tuple so the region stays
        // contiguous, then write the new payload into the gap.
        let free_space_ptr = Self::free_space_pointer(data) as usize;
        let new_free_space_ptr = free_space_ptr + old_size - new_size;
        data.copy_within(free_space_ptr..tuple_offset, new_free_space_ptr);

        let new_offset = tuple_offset + old_size - new_size;
        data[new_offset..new_offset + new_size].copy_from_slice(new_tuple.data());
        Self::set_slot_size(data, slot_id, new_size as u32);
        Self::set_free_space_pointer(data, new_free_space_ptr as u32);

        // Offsets have no correlation with slot order, so walk them all.
        // The bound is the old tuple's end, not its start, so the updated
        // slot repositions itself in the same pass.
        let delta = old_size as i64 - new_size as i64;
        let tuple_count = Self::tuple_count(data);
        for i in 0..tuple_count {
            let offset_i = Self::slot_offset(data, i);
            if Self::slot_size(data, i) != 0 && (offset_i as usize) < tuple_offset + old_size {
                Self::set_slot_offset(data, i, (offset_i as i64 + delta) as u32);
            }
        }

        let old_image = old_tuple.payload();
        let new_image = new_tuple.payload();
        Self::emit_log(data, txn, log, move |txn_id, prev_lsn| {
            LogRecord::update(txn_id, prev_lsn, rid, old_image, new_image)
        });

        PageUpdate::Updated(old_tuple)
    }

    /// Physically deletes a tuple, reclaiming its payload bytes and
    /// freeing its slot.
    ///
    /// The slot must refer to a non-free tuple, live or marked deleted.
    pub fn apply_delete(
        data: &mut [u8],
        rid: Rid,
        txn: Option<&TransactionContext>,
        log: Option<&LogManager>,
    ) {
        assert_eq!(rid.page_id, Self::page_id(data), "rid refers to another page");

        let slot_id = rid.slot_id;
        assert!(slot_id < Self::tuple_count(data), "invalid slot id");

        let raw_size = Self::slot_size(data, slot_id);
        assert!(raw_size != 0, "cannot delete a free slot");
        let tuple_size = (raw_size & !DELETE_MASK) as usize;
        let tuple_offset = Self::slot_offset(data, slot_id) as usize;

        // Copy out the deleted image for undo before the bytes move
        if log.is_some() {
            let image = Bytes::copy_from_slice(&data[tuple_offset..tuple_offset + tuple_size]);
            Self::emit_log(data, txn, log, move |txn_id, prev_lsn| {
                LogRecord::apply_delete(txn_id, prev_lsn, rid, image)
            });
        }

        // Close the hole
        let free_space_ptr = Self::free_space_pointer(data) as usize;
        data.copy_within(free_space_ptr..tuple_offset, free_space_ptr + tuple_size);
        Self::set_slot_size(data, slot_id, 0);
        Self::set_slot_offset(data, slot_id, 0);
        Self::set_free_space_pointer(data, (free_space_ptr + tuple_size) as u32);

        let tuple_count = Self::tuple_count(data);
        for i in 0..tuple_count {
            let offset_i = Self::slot_offset(data, i);
            if Self::slot_size(data, i) != 0 && (offset_i as usize) < tuple_offset {
                Self::set_slot_offset(data, i, offset_i + tuple_size as u32);
            }
        }
    }

    /// Clears a tuple's delete bit.
    ///
    /// A record is appended even when the slot is already live, so an
    /// aborting transaction's undo chain keeps one record per undone
    /// operation.
    pub fn rollback_delete(
        data: &mut [u8],
        rid: Rid,
        txn: Option<&TransactionContext>,
        log: Option<&LogManager>,
    ) {
        assert_eq!(rid.page_id, Self::page_id(data), "rid refers to another page");

        let slot_id = rid.slot_id;
        assert!(slot_id < Self::tuple_count(data), "invalid slot id");
        let raw_size = Self::slot_size(data, slot_id);

        Self::emit_log(data, txn, log, |txn_id, prev_lsn| {
            LogRecord::rollback_delete(txn_id, prev_lsn, rid)
        });

        if Self::is_deleted(raw_size) {
            Self::set_slot_size(data, slot_id, raw_size & !DELETE_MASK);
        }
    }

    /// Copies a live tuple out of the page.
    ///
    /// Returns None for an out-of-range, free, or marked-deleted slot; at
    /// read committed isolation callers treat all three as "skip".
    pub fn get_tuple(data: &[u8], rid: Rid) -> Option<Tuple> {
        assert_eq!(rid.page_id, Self::page_id(data), "rid refers to another page");

        let slot_id = rid.slot_id;
        if slot_id >= Self::tuple_count(data) {
            return None;
        }

        let raw_size = Self::slot_size(data, slot_id);
        if !Self::is_live(raw_size) {
            return None;
        }

        let offset = Self::slot_offset(data, slot_id) as usize;
        let mut tuple = Tuple::from_payload(&data[offset..offset + raw_size as usize]);
        tuple.set_rid(rid);
        Some(tuple)
    }

    /// Returns the rid of the first live tuple on this page.
    pub fn first_tuple_rid(data: &[u8]) -> Option<Rid> {
        let tuple_count = Self::tuple_count(data);
        for i in 0..tuple_count {
            if Self::is_live(Self::slot_size(data, i)) {
                return Some(Rid::new(Self::page_id(data), i));
            }
        }
        None
    }

    /// Returns the rid of the first live tuple after `current` on this page.
    pub fn next_tuple_rid(data: &[u8], current: Rid) -> Option<Rid> {
        assert_eq!(
            current.page_id,
            Self::page_id(data),
            "rid refers to another page"
        );

        let tuple_count = Self::tuple_count(data);
        for i in current.slot_id + 1..tuple_count {
            if Self::is_live(Self::slot_size(data, i)) {
                return Some(Rid::new(Self::page_id(data), i));
            }
        }
        None
    }
}
