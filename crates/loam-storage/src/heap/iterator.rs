//! Forward iterator over a heap file.

use super::file::HeapFile;
use crate::tuple::Tuple;
use loam_common::rid::Rid;

/// Forward cursor over the live tuples of a heap file.
///
/// The cursor advances (page, slot) in chain order, skipping free and
/// marked-deleted slots. Each step pins one page at a time and yields an
/// owned copy of the tuple (with its rid set) - the payload lives in a
/// frame the iterator must not keep pinned across user code.
///
/// The iterator is single-pass-safe under non-concurrent mutation;
/// behavior under concurrent mutation of the visited pages is unspecified.
/// Pool or I/O failures end the iteration early.
pub struct HeapIterator<'a> {
    heap: &'a HeapFile,
    current: Option<Rid>,
}

impl<'a> HeapIterator<'a> {
    /// Positions a new cursor on the heap's first live tuple.
    pub(super) fn new(heap: &'a HeapFile) -> Self {
        let current = heap.first_rid().ok().flatten();
        Self { heap, current }
    }

    /// Returns the rid the cursor is positioned on.
    pub fn current_rid(&self) -> Option<Rid> {
        self.current
    }
}

impl Iterator for HeapIterator<'_> {
    type Item = Tuple;

    fn next(&mut self) -> Option<Tuple> {
        loop {
            let rid = self.current?;
            let tuple = self.heap.get_tuple(rid).ok();
            self.current = self.heap.rid_after(rid).ok().flatten();
            if let Some(tuple) = tuple {
                return Some(tuple);
            }
            // the tuple vanished between positioning and the read; skip it
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loam_buffer::{BufferPoolConfig, BufferPoolManager, DiskManager, DiskManagerConfig};
    use std::sync::Arc;

    fn create_test_heap() -> (HeapFile, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let disk = Arc::new(
            DiskManager::new(DiskManagerConfig {
                data_dir: dir.path().to_path_buf(),
                fsync_enabled: false,
            })
            .unwrap(),
        );
        let pool = Arc::new(BufferPoolManager::new(
            BufferPoolConfig { num_frames: 32 },
            disk,
        ));
        let heap = HeapFile::create(pool, None).unwrap();
        (heap, dir)
    }

    #[test]
    fn test_empty_heap_yields_nothing() {
        let (heap, _dir) = create_test_heap();
        assert_eq!(heap.iter().count(), 0);
    }

    #[test]
    fn test_yields_in_insertion_order() {
        let (heap, _dir) = create_test_heap();
        for i in 0..5u8 {
            heap.insert_tuple(&Tuple::new(vec![i; 16]), None).unwrap();
        }

        let seen: Vec<u8> = heap.iter().map(|t| t.data()[0]).collect();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_tuples_carry_their_rid() {
        let (heap, _dir) = create_test_heap();
        let rid = heap.insert_tuple(&Tuple::new(&b"x"[..]), None).unwrap();

        let tuples: Vec<Tuple> = heap.iter().collect();
        assert_eq!(tuples.len(), 1);
        assert_eq!(tuples[0].rid(), Some(rid));
    }

    #[test]
    fn test_skips_deleted_tuples() {
        let (heap, _dir) = create_test_heap();
        let mut rids = Vec::new();
        for i in 0..6u8 {
            rids.push(heap.insert_tuple(&Tuple::new(vec![i; 8]), None).unwrap());
        }

        heap.mark_delete(rids[1], None).unwrap();
        heap.apply_delete(rids[4], None).unwrap();

        let seen: Vec<u8> = heap.iter().map(|t| t.data()[0]).collect();
        assert_eq!(seen, vec![0, 2, 3, 5]);
    }

    #[test]
    fn test_all_deleted_yields_nothing() {
        let (heap, _dir) = create_test_heap();
        let mut rids = Vec::new();
        for i in 0..3u8 {
            rids.push(heap.insert_tuple(&Tuple::new(vec![i; 8]), None).unwrap());
        }
        for rid in &rids {
            heap.mark_delete(*rid, None).unwrap();
        }

        assert_eq!(heap.iter().count(), 0);
    }

    #[test]
    fn test_crosses_page_boundaries() {
        let (heap, _dir) = create_test_heap();

        // Large tuples force the chain past a single page
        for i in 0..9u8 {
            heap.insert_tuple(&Tuple::new(vec![i; 1500]), None).unwrap();
        }

        let seen: Vec<u8> = heap.iter().map(|t| t.data()[0]).collect();
        assert_eq!(seen, (0..9).collect::<Vec<u8>>());
    }

    #[test]
    fn test_skips_pages_with_no_live_tuples() {
        let (heap, _dir) = create_test_heap();

        let mut rids = Vec::new();
        for i in 0..9u8 {
            rids.push(
                heap.insert_tuple(&Tuple::new(vec![i; 1500]), None).unwrap(),
            );
        }
        // Empty out the middle page(s)
        for rid in &rids[2..4] {
            heap.mark_delete(*rid, None).unwrap();
        }

        let seen: Vec<u8> = heap.iter().map(|t| t.data()[0]).collect();
        assert_eq!(seen, vec![0, 1, 4, 5, 6, 7, 8]);
    }
}
