use super::*;
use pretty_assertions::assert_eq;

#[test]
fn insert_then_read_round_trips() {
    let mut heap = HeapFile::new(16);
    let rid = heap.insert(b"hello").unwrap();
    let record = heap.read(rid).unwrap();
    assert_eq!(record.bytes, b"hello");
    assert_eq!(record.rid, rid);
}

#[test]
fn delete_then_read_returns_empty() {
    let mut heap = HeapFile::new(16);
    let rid = heap.insert(b"gone").unwrap();
    assert!(heap.delete(rid).unwrap());
    let record = heap.read(rid).unwrap();
    assert!(record.is_empty());
}

#[test]
fn delete_does_not_decrement_record_count() {
    let mut heap = HeapFile::new(16);
    let rid0 = heap.insert(b"a").unwrap();
    let _rid1 = heap.insert(b"b").unwrap();
    heap.delete(rid0).unwrap();
    // The page still reports two records; seq_scan should only surface one.
    let rows = heap.seq_scan().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].bytes, b"b");
}

#[test]
fn read_invalid_slot_returns_empty_record() {
    let mut heap = HeapFile::new(16);
    let rid = heap.insert(b"only").unwrap();
    let bogus = RecordId::new(rid.page_id, rid.slot + 5);
    let record = heap.read(bogus).unwrap();
    assert!(record.is_empty());
}

#[test]
fn delete_invalid_slot_returns_false() {
    let mut heap = HeapFile::new(16);
    let rid = heap.insert(b"only").unwrap();
    let bogus = RecordId::new(rid.page_id, rid.slot + 5);
    assert!(!heap.delete(bogus).unwrap());
}

#[test]
fn seq_scan_preserves_insertion_order() {
    let mut heap = HeapFile::new(16);
    let mut rids = Vec::new();
    for i in 0..100 {
        let bytes = format!("user_{i}");
        rids.push(heap.insert(bytes.as_bytes()).unwrap());
    }
    let rows = heap.seq_scan().unwrap();
    assert_eq!(rows.len(), 100);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.bytes, format!("user_{i}").into_bytes());
        assert_eq!(row.rid, rids[i]);
    }
}

#[test]
fn s5_delete_slot_zero_of_page_zero_reduces_scan_count() {
    let mut heap = HeapFile::new(1024);
    let mut rids = Vec::new();
    for i in 0..100 {
        let bytes = format!("user_{i}, page_{}", 20 + i % 10);
        rids.push(heap.insert(bytes.as_bytes()).unwrap());
    }
    assert_eq!(heap.seq_scan().unwrap().len(), 100);

    let target = rids.iter().find(|r| r.page_id == PageId(0) && r.slot == 0).unwrap();
    heap.delete(*target).unwrap();
    assert_eq!(heap.seq_scan().unwrap().len(), 99);
}

#[test]
fn insert_overflows_to_a_new_page_when_current_is_full() {
    let mut heap = HeapFile::new(16);
    let payload = vec![b'x'; PAGE_SIZE - RECORD_HEADER_SIZE - 8];
    let rid_a = heap.insert(&payload).unwrap();
    let rid_b = heap.insert(&payload).unwrap();
    assert!(rid_b.page_id.0 > rid_a.page_id.0);
}

#[test]
fn insertion_exactly_filling_free_space_succeeds() {
    let mut heap = HeapFile::new(16);
    let payload = vec![b'x'; PAGE_SIZE - RECORD_HEADER_SIZE];
    heap.insert(&payload).unwrap();
}

#[test]
fn insertion_one_byte_too_large_allocates_new_page_rather_than_failing() {
    // A record that does not fit on the first page simply overflows to the
    // next one; `NoFreeSpace` is reserved for a record too large for any
    // single page.
    let mut heap = HeapFile::new(16);
    let first = vec![b'x'; PAGE_SIZE - RECORD_HEADER_SIZE - 4];
    let rid_a = heap.insert(&first).unwrap();
    let second = vec![b'y'; 8];
    let rid_b = heap.insert(&second).unwrap();
    assert!(rid_b.page_id.0 > rid_a.page_id.0);
}

#[test]
fn record_larger_than_a_page_fails() {
    let mut heap = HeapFile::new(16);
    let huge = vec![b'z'; PAGE_SIZE];
    let err = heap.insert(&huge).unwrap_err();
    assert!(matches!(err, DbError::NoFreeSpace(_)));
}

#[test]
fn seq_scan_on_empty_heap_is_empty() {
    let mut heap = HeapFile::new(16);
    assert!(heap.seq_scan().unwrap().is_empty());
}
