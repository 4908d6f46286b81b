//! Heap file: a doubly-linked chain of heap pages forming one table.
//!
//! The heap file owns neither pages nor the buffer pool; each operation
//! pins the page it needs, takes the frame's data latch, delegates to the
//! page, and unpins exactly once (dirty iff bytes changed) before
//! returning.

use super::constants::MAX_TUPLE_SIZE;
use super::iterator::HeapIterator;
use super::page::{HeapPage, PageUpdate};
use crate::tuple::Tuple;
use loam_buffer::BufferPoolManager;
use loam_common::page::PageId;
use loam_common::rid::Rid;
use loam_common::{LoamError, Result};
use loam_wal::{LogManager, TransactionContext};
use std::sync::Arc;

/// High-level tuple operations routed over a chain of heap pages.
///
/// A heap file is *logged* when constructed with a log manager (every
/// mutation then requires a transaction context) or *unlogged* for bulk
/// loads and tests.
pub struct HeapFile {
    /// Head of the page chain.
    first_page_id: PageId,
    /// Buffer pool all page access goes through.
    pool: Arc<BufferPoolManager>,
    /// Log manager; None disables logging.
    log: Option<Arc<LogManager>>,
}

impl HeapFile {
    /// Creates a new heap file by allocating and formatting its first page.
    pub fn create(pool: Arc<BufferPoolManager>, log: Option<Arc<LogManager>>) -> Result<Self> {
        let (first_page_id, frame) = pool.new_page()?;
        {
            let mut data = frame.write_data();
            HeapPage::init(&mut data[..], first_page_id, PageId::INVALID);
        }
        pool.unpin_page(first_page_id, true);

        Ok(Self {
            first_page_id,
            pool,
            log,
        })
    }

    /// Opens an existing heap file by its first page.
    pub fn open(
        first_page_id: PageId,
        pool: Arc<BufferPoolManager>,
        log: Option<Arc<LogManager>>,
    ) -> Self {
        assert!(
            first_page_id.is_valid(),
            "an existing heap file has at least one page"
        );
        Self {
            first_page_id,
            pool,
            log,
        }
    }

    /// Returns the id of the first page in the chain.
    pub fn first_page_id(&self) -> PageId {
        self.first_page_id
    }

    fn log_ref(&self) -> Option<&LogManager> {
        self.log.as_deref()
    }

    /// Inserts a tuple, walking the chain and extending it at the tail if
    /// no page has room.
    pub fn insert_tuple(&self, tuple: &Tuple, txn: Option<&TransactionContext>) -> Result<Rid> {
        self.insert_tuple_with(tuple, txn, |_| {})
    }

    /// Inserts a tuple and invokes `on_insert` with the new rid while the
    /// page latch is still held.
    ///
    /// Two-phase-locking callers use the hook to acquire the row lock
    /// before the insert becomes visible. The callback must not re-enter
    /// this heap file.
    pub fn insert_tuple_with(
        &self,
        tuple: &Tuple,
        txn: Option<&TransactionContext>,
        on_insert: impl FnOnce(Rid),
    ) -> Result<Rid> {
        if tuple.size() == 0 || tuple.size() > MAX_TUPLE_SIZE {
            return Err(LoamError::TupleTooLarge {
                size: tuple.size(),
                max: MAX_TUPLE_SIZE,
            });
        }

        let mut page_id = self.first_page_id;
        loop {
            let frame = self.pool.fetch_page(page_id)?;
            let mut data = frame.write_data();

            if let Some(rid) = HeapPage::insert_tuple(&mut data[..], tuple, txn, self.log_ref()) {
                on_insert(rid);
                drop(data);
                self.pool.unpin_page(page_id, true);
                return Ok(rid);
            }

            let next = HeapPage::next_page_id(&data[..]);
            if next.is_valid() {
                drop(data);
                self.pool.unpin_page(page_id, false);
                page_id = next;
                continue;
            }

            // The tail is full: chain a fresh page and splice it in
            let (new_page_id, new_frame) = match self.pool.new_page() {
                Ok(allocated) => allocated,
                Err(e) => {
                    drop(data);
                    self.pool.unpin_page(page_id, false);
                    return Err(e);
                }
            };

            let mut new_data = new_frame.write_data();
            HeapPage::init(&mut new_data[..], new_page_id, page_id);
            HeapPage::set_next_page_id(&mut data[..], new_page_id);
            drop(data);
            self.pool.unpin_page(page_id, true);

            // The size was checked against MAX_TUPLE_SIZE, so a fresh page
            // always has room
            let rid = match HeapPage::insert_tuple(&mut new_data[..], tuple, txn, self.log_ref())
            {
                Some(rid) => rid,
                None => unreachable!("fresh page rejected a size-checked tuple"),
            };
            on_insert(rid);
            drop(new_data);
            self.pool.unpin_page(new_page_id, true);
            return Ok(rid);
        }
    }

    /// Marks the tuple at `rid` as deleted.
    pub fn mark_delete(&self, rid: Rid, txn: Option<&TransactionContext>) -> Result<()> {
        let frame = self.pool.fetch_page(rid.page_id)?;
        let mut data = frame.write_data();
        let marked = HeapPage::mark_delete(&mut data[..], rid, txn, self.log_ref());
        drop(data);
        self.pool.unpin_page(rid.page_id, marked);

        if marked {
            Ok(())
        } else {
            Err(LoamError::InvalidRid(rid))
        }
    }

    /// Updates the tuple at `rid` in place, returning its old value.
    ///
    /// `DoesNotFit` means the page cannot hold the new payload; the caller
    /// is expected to fall back to mark-delete plus insert elsewhere.
    pub fn update_tuple(
        &self,
        tuple: &Tuple,
        rid: Rid,
        txn: Option<&TransactionContext>,
    ) -> Result<Tuple> {
        let frame = self.pool.fetch_page(rid.page_id)?;
        let mut data = frame.write_data();
        let outcome = HeapPage::update_tuple(&mut data[..], tuple, rid, txn, self.log_ref());
        drop(data);

        match outcome {
            PageUpdate::Updated(old_tuple) => {
                self.pool.unpin_page(rid.page_id, true);
                Ok(old_tuple)
            }
            PageUpdate::DoesNotFit => {
                self.pool.unpin_page(rid.page_id, false);
                Err(LoamError::DoesNotFit {
                    rid,
                    size: tuple.size(),
                })
            }
            PageUpdate::InvalidSlot => {
                self.pool.unpin_page(rid.page_id, false);
                Err(LoamError::InvalidRid(rid))
            }
        }
    }

    /// Physically deletes the tuple at `rid`, reclaiming its space.
    pub fn apply_delete(&self, rid: Rid, txn: Option<&TransactionContext>) -> Result<()> {
        let frame = self.pool.fetch_page(rid.page_id)?;
        let mut data = frame.write_data();
        HeapPage::apply_delete(&mut data[..], rid, txn, self.log_ref());
        drop(data);
        self.pool.unpin_page(rid.page_id, true);
        Ok(())
    }

    /// Clears the delete mark on the tuple at `rid`.
    pub fn rollback_delete(&self, rid: Rid, txn: Option<&TransactionContext>) -> Result<()> {
        let frame = self.pool.fetch_page(rid.page_id)?;
        let mut data = frame.write_data();
        HeapPage::rollback_delete(&mut data[..], rid, txn, self.log_ref());
        drop(data);
        self.pool.unpin_page(rid.page_id, true);
        Ok(())
    }

    /// Reads the tuple at `rid`.
    ///
    /// Free and marked-deleted slots surface as `InvalidRid`.
    pub fn get_tuple(&self, rid: Rid) -> Result<Tuple> {
        let frame = self.pool.fetch_page(rid.page_id)?;
        let data = frame.read_data();
        let tuple = HeapPage::get_tuple(&data[..], rid);
        drop(data);
        self.pool.unpin_page(rid.page_id, false);

        tuple.ok_or(LoamError::InvalidRid(rid))
    }

    /// Returns a forward iterator over the live tuples of this heap.
    pub fn iter(&self) -> HeapIterator<'_> {
        HeapIterator::new(self)
    }

    /// Finds the first live rid in the chain, if any.
    pub(super) fn first_rid(&self) -> Result<Option<Rid>> {
        self.first_rid_from(self.first_page_id)
    }

    /// Finds the first live rid at or after `page_id` in the chain.
    fn first_rid_from(&self, mut page_id: PageId) -> Result<Option<Rid>> {
        while page_id.is_valid() {
            let frame = self.pool.fetch_page(page_id)?;
            let data = frame.read_data();
            let first = HeapPage::first_tuple_rid(&data[..]);
            let next = HeapPage::next_page_id(&data[..]);
            drop(data);
            self.pool.unpin_page(page_id, false);

            if first.is_some() {
                return Ok(first);
            }
            page_id = next;
        }
        Ok(None)
    }

    /// Finds the live rid following `rid`, crossing page boundaries.
    pub(super) fn rid_after(&self, rid: Rid) -> Result<Option<Rid>> {
        let frame = self.pool.fetch_page(rid.page_id)?;
        let data = frame.read_data();
        let next_rid = HeapPage::next_tuple_rid(&data[..], rid);
        let next_page = HeapPage::next_page_id(&data[..]);
        drop(data);
        self.pool.unpin_page(rid.page_id, false);

        if next_rid.is_some() {
            return Ok(next_rid);
        }
        self.first_rid_from(next_page)
    }
}
