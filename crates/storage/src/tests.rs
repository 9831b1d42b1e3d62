use super::*;
use pretty_assertions::assert_eq;

#[test]
fn fresh_page_is_empty() {
    let page = Page::new(PageId(0));
    assert_eq!(page.free_space(), PAGE_SIZE);
    assert_eq!(page.record_count, 0);
    assert!(!page.is_dirty);
    assert_eq!(page.pin_count, 0);
}

#[test]
fn free_space_accounts_for_header_and_payload() {
    let mut page = Page::new(PageId(0));
    page.record_count = 1;
    page.used_data_size = 10;
    assert_eq!(page.free_space(), PAGE_SIZE - RECORD_HEADER_SIZE - 10);
}

#[test]
fn can_fit_exact_remaining_space() {
    let mut page = Page::new(PageId(0));
    page.record_count = 0;
    page.used_data_size = PAGE_SIZE - RECORD_HEADER_SIZE - 8;
    assert!(page.can_fit(8));
    assert!(!page.can_fit(9));
}

#[test]
fn reset_clears_payload_and_metadata() {
    let mut page = Page::new(PageId(0));
    page.data_mut()[0] = 0xFF;
    page.record_count = 3;
    page.used_data_size = 100;
    page.is_dirty = true;
    page.pin_count = 2;

    page.reset(PageId(7));

    assert_eq!(page.page_id, PageId(7));
    assert_eq!(page.record_count, 0);
    assert_eq!(page.used_data_size, 0);
    assert!(!page.is_dirty);
    assert_eq!(page.pin_count, 0);
    assert!(page.data().iter().all(|&b| b == 0));
}

#[test]
fn record_header_round_trips() {
    let header = RecordHeader {
        is_deleted: true,
        record_size: 1234,
    };
    let mut buf = [0u8; RECORD_HEADER_SIZE];
    header.encode(&mut buf);
    assert_eq!(RecordHeader::decode(&buf), header);
}

#[test]
fn record_header_encodes_little_endian() {
    let header = RecordHeader {
        is_deleted: false,
        record_size: 0x0102_0304,
    };
    let mut buf = [0u8; RECORD_HEADER_SIZE];
    header.encode(&mut buf);
    assert_eq!(buf, [0, 0x04, 0x03, 0x02, 0x01]);
}
