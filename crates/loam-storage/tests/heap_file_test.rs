//! End-to-end tests for the heap storage stack: buffer pool, WAL, slotted
//! pages, heap file, and iterator working together.

use bytes::Bytes;
use rand::Rng;
use std::sync::Arc;
use tempfile::tempdir;

use loam_buffer::{BufferPoolConfig, BufferPoolManager, DiskManager, DiskManagerConfig};
use loam_common::page::{PageId, PAGE_SIZE};
use loam_common::rid::Rid;
use loam_common::{LoamError, StorageConfig, TypeId};
use loam_storage::{Column, HeapFile, HeapPage, Schema, Tuple, Value};
use loam_wal::{read_log_file, LogManager, LogRecordKind, TransactionContext};

fn build_stack(config: &StorageConfig) -> (Arc<BufferPoolManager>, Option<Arc<LogManager>>) {
    let disk = Arc::new(
        DiskManager::new(DiskManagerConfig {
            data_dir: config.data_dir.clone(),
            fsync_enabled: config.fsync_enabled,
        })
        .unwrap(),
    );
    let pool = Arc::new(BufferPoolManager::new(
        BufferPoolConfig {
            num_frames: config.buffer_pool_frames,
        },
        disk,
    ));
    let log = config
        .wal_path
        .as_ref()
        .map(|path| Arc::new(LogManager::with_file(path, config.fsync_enabled).unwrap()));
    (pool, log)
}

fn unlogged_heap(frames: usize) -> (HeapFile, Arc<BufferPoolManager>, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let config = StorageConfig {
        data_dir: dir.path().to_path_buf(),
        wal_path: None,
        buffer_pool_frames: frames,
        fsync_enabled: false,
    };
    let (pool, _log) = build_stack(&config);
    let heap = HeapFile::create(Arc::clone(&pool), None).unwrap();
    (heap, pool, dir)
}

#[test]
fn insert_three_and_iterate_in_order() {
    let (heap, _pool, _dir) = unlogged_heap(16);

    let schema = Schema::new(vec![Column::new("n", TypeId::Integer)]);
    let mut rids = Vec::new();
    for n in 1..=3 {
        let tuple = Tuple::from_values(&[Value::Integer(n)], &schema);
        rids.push(heap.insert_tuple(&tuple, None).unwrap());
    }

    // all three share the first page, with dense slot ids
    for (i, rid) in rids.iter().enumerate() {
        assert_eq!(rid.page_id, heap.first_page_id());
        assert_eq!(rid.slot_id, i as u32);
    }

    let seen: Vec<Value> = heap.iter().map(|t| t.value(&schema, 0)).collect();
    assert_eq!(
        seen,
        vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]
    );
}

#[test]
fn mark_delete_hides_then_rollback_restores() {
    let (heap, _pool, _dir) = unlogged_heap(16);

    let tuple = Tuple::new(&b"A"[..]);
    let rid = heap.insert_tuple(&tuple, None).unwrap();

    heap.mark_delete(rid, None).unwrap();
    assert_eq!(heap.iter().count(), 0);
    assert!(matches!(
        heap.get_tuple(rid),
        Err(LoamError::InvalidRid(_))
    ));

    heap.rollback_delete(rid, None).unwrap();
    let seen: Vec<Tuple> = heap.iter().collect();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].data(), b"A".as_ref());
}

#[test]
fn thousand_inserts_chain_the_expected_page_count() {
    let (heap, pool, _dir) = unlogged_heap(64);

    const TUPLE_SIZE: usize = 100;
    const COUNT: usize = 1000;
    let per_page = (PAGE_SIZE - 24) / (TUPLE_SIZE + 8);
    let expected_pages = COUNT.div_ceil(per_page);

    let mut rids = Vec::with_capacity(COUNT);
    for i in 0..COUNT {
        let tuple = Tuple::new(vec![(i % 251) as u8; TUPLE_SIZE]);
        rids.push(heap.insert_tuple(&tuple, None).unwrap());
    }

    // walk the chain, checking both link directions
    let mut pages = vec![heap.first_page_id()];
    loop {
        let page_id = *pages.last().unwrap();
        let frame = pool.fetch_page(page_id).unwrap();
        let next = HeapPage::next_page_id(&frame.read_data()[..]);
        pool.unpin_page(page_id, false);
        if !next.is_valid() {
            break;
        }
        pages.push(next);
    }
    assert_eq!(pages.len(), expected_pages);

    for pair in pages.windows(2) {
        let frame = pool.fetch_page(pair[1]).unwrap();
        let prev = HeapPage::prev_page_id(&frame.read_data()[..]);
        pool.unpin_page(pair[1], false);
        assert_eq!(prev, pair[0]);
    }

    // every tuple is retrievable with its original payload
    for (i, rid) in rids.iter().enumerate() {
        let tuple = heap.get_tuple(*rid).unwrap();
        assert_eq!(tuple.data(), &[(i % 251) as u8; TUPLE_SIZE][..]);
    }
    assert_eq!(heap.iter().count(), COUNT);
}

#[test]
fn update_in_place_then_does_not_fit() {
    let (heap, _pool, _dir) = unlogged_heap(16);

    // Leave 250 bytes free after inserting the 200-byte tuple
    let free_after_init = PAGE_SIZE - 24;
    let filler_size = free_after_init - 8 - 200 - 8 - 250;
    heap.insert_tuple(&Tuple::new(vec![0xEE; filler_size]), None)
        .unwrap();
    let rid = heap
        .insert_tuple(&Tuple::new(vec![0xAA; 200]), None)
        .unwrap();

    // 150 fits in place of 200
    let old = heap
        .update_tuple(&Tuple::new(vec![0xAB; 150]), rid, None)
        .unwrap();
    assert_eq!(old.data(), &[0xAA; 200][..]);
    assert_eq!(heap.get_tuple(rid).unwrap().data(), &[0xAB; 150][..]);

    // The shrink grew free space to 300; an update fits while
    // free + old_size covers it (300 + 150 = 450) and fails one byte past
    heap.update_tuple(&Tuple::new(vec![0xAC; 450]), rid, None)
        .unwrap();
    let result = heap.update_tuple(&Tuple::new(vec![0xAD; 451]), rid, None);
    assert!(matches!(result, Err(LoamError::DoesNotFit { .. })));
}

#[test]
fn freed_slot_is_reused_and_neighbors_are_untouched() {
    let (heap, _pool, _dir) = unlogged_heap(16);

    let a = Tuple::new(vec![0xA1; 80]);
    let b = Tuple::new(vec![0xB2; 90]);
    let c = Tuple::new(vec![0xC3; 70]);
    let rid_a = heap.insert_tuple(&a, None).unwrap();
    let rid_b = heap.insert_tuple(&b, None).unwrap();
    let rid_c = heap.insert_tuple(&c, None).unwrap();

    heap.apply_delete(rid_b, None).unwrap();

    let d = Tuple::new(vec![0xD4; 90]);
    let rid_d = heap.insert_tuple(&d, None).unwrap();
    assert_eq!(rid_d.slot_id, rid_b.slot_id);

    assert_eq!(heap.get_tuple(rid_a).unwrap().data(), a.data());
    assert_eq!(heap.get_tuple(rid_c).unwrap().data(), c.data());
    assert_eq!(heap.get_tuple(rid_d).unwrap().data(), d.data());
}

#[test]
fn crash_drill_log_matches_every_mutation() {
    let dir = tempdir().unwrap();
    let config = StorageConfig {
        data_dir: dir.path().to_path_buf(),
        wal_path: Some(dir.path().join("loam.wal")),
        buffer_pool_frames: 16,
        fsync_enabled: false,
    };
    let (pool, log) = build_stack(&config);
    let log = log.unwrap();
    let heap = HeapFile::create(Arc::clone(&pool), Some(Arc::clone(&log))).unwrap();
    let txn = TransactionContext::new(log.allocate_txn_id());
    log.log_begin(&txn);

    let page_lsn = |pool: &BufferPoolManager, page_id: PageId| {
        let frame = pool.fetch_page(page_id).unwrap();
        let lsn = HeapPage::lsn(&frame.read_data()[..]);
        pool.unpin_page(page_id, false);
        lsn
    };

    let check_last = |kind: LogRecordKind, rid: Rid| {
        let record = log.last_record().unwrap();
        assert_eq!(record.kind, kind);
        assert_eq!(record.rid, rid);
        assert_eq!(record.lsn, page_lsn(pool.as_ref(), rid.page_id));
        assert_eq!(txn.prev_lsn(), record.lsn);
    };

    let rid = heap
        .insert_tuple(&Tuple::new(&b"drill"[..]), Some(&txn))
        .unwrap();
    check_last(LogRecordKind::Insert, rid);

    heap.update_tuple(&Tuple::new(&b"DRILL!"[..]), rid, Some(&txn))
        .unwrap();
    check_last(LogRecordKind::Update, rid);

    heap.mark_delete(rid, Some(&txn)).unwrap();
    check_last(LogRecordKind::MarkDelete, rid);

    heap.rollback_delete(rid, Some(&txn)).unwrap();
    check_last(LogRecordKind::RollbackDelete, rid);

    heap.apply_delete(rid, Some(&txn)).unwrap();
    check_last(LogRecordKind::ApplyDelete, rid);

    log.log_commit(&txn);
    log.flush().unwrap();

    // the durable stream round-trips and keeps the undo chain intact
    let records = read_log_file(config.wal_path.as_ref().unwrap()).unwrap();
    assert_eq!(records.len(), log.record_count());
    assert_eq!(records[0].kind, LogRecordKind::Begin);
    assert_eq!(records.last().unwrap().kind, LogRecordKind::Commit);
    for pair in records.windows(2) {
        assert_eq!(pair[1].prev_lsn, pair[0].lsn);
        assert!(pair[0].lsn < pair[1].lsn);
    }
}

#[test]
fn tuple_codec_roundtrips_through_pages() {
    let (heap, _pool, _dir) = unlogged_heap(16);

    let schema = Schema::new(vec![
        Column::new("id", TypeId::BigInt),
        Column::new("name", TypeId::Varchar),
        Column::new("active", TypeId::Boolean),
        Column::new("nick", TypeId::Varchar),
    ]);

    let tuple = Tuple::from_values(
        &[
            Value::BigInt(123_456_789_000),
            Value::Varchar("loam".to_string()),
            Value::Boolean(true),
            Value::Null,
        ],
        &schema,
    );

    // standalone serialized form round-trips bytewise
    let recovered = Tuple::deserialize(&tuple.serialize()).unwrap();
    assert_eq!(recovered.data(), tuple.data());

    // and so does the in-page form
    let rid = heap.insert_tuple(&tuple, None).unwrap();
    let read = heap.get_tuple(rid).unwrap();
    assert_eq!(read.data(), tuple.data());
    assert_eq!(read.value(&schema, 0), Value::BigInt(123_456_789_000));
    assert_eq!(read.value(&schema, 1), Value::Varchar("loam".to_string()));
    assert_eq!(read.value(&schema, 2), Value::Boolean(true));
    assert!(read.is_null(&schema, 3));
}

#[test]
fn random_sized_inserts_stay_retrievable() {
    let (heap, _pool, _dir) = unlogged_heap(64);
    let mut rng = rand::thread_rng();

    let mut expected: Vec<(Rid, Vec<u8>)> = Vec::new();
    for _ in 0..300 {
        let size = rng.gen_range(1..=900);
        let byte = rng.gen::<u8>();
        let payload = vec![byte; size];
        let rid = heap
            .insert_tuple(&Tuple::new(payload.clone()), None)
            .unwrap();
        expected.push((rid, payload));
    }

    // delete a third, bytewise-check the rest
    for (i, (rid, _)) in expected.iter().enumerate() {
        if i % 3 == 0 {
            heap.mark_delete(*rid, None).unwrap();
        }
    }
    for (i, (rid, payload)) in expected.iter().enumerate() {
        if i % 3 == 0 {
            assert!(heap.get_tuple(*rid).is_err());
        } else {
            assert_eq!(heap.get_tuple(*rid).unwrap().data(), &payload[..]);
        }
    }
    assert_eq!(heap.iter().count(), expected.len() - expected.len().div_ceil(3));
}

#[test]
fn heap_survives_pool_eviction_pressure() {
    // A pool far smaller than the page chain forces constant eviction and
    // write-back underneath the heap file
    let (heap, _pool, _dir) = unlogged_heap(4);

    let mut rids = Vec::new();
    for i in 0..200u8 {
        rids.push(
            heap.insert_tuple(&Tuple::new(vec![i; 500]), None).unwrap(),
        );
    }

    for (i, rid) in rids.iter().enumerate() {
        assert_eq!(heap.get_tuple(*rid).unwrap().data(), &[i as u8; 500][..]);
    }
}

#[test]
fn tuple_too_large_is_rejected_up_front() {
    let (heap, _pool, _dir) = unlogged_heap(8);

    let max = PAGE_SIZE - 24 - 8;
    assert!(heap.insert_tuple(&Tuple::new(vec![1; max]), None).is_ok());
    assert!(matches!(
        heap.insert_tuple(&Tuple::new(vec![1; max + 1]), None),
        Err(LoamError::TupleTooLarge { .. })
    ));
    assert!(matches!(
        heap.insert_tuple(&Tuple::new(Bytes::new()), None),
        Err(LoamError::TupleTooLarge { .. })
    ));
}
