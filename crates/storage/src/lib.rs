//! Fixed-size page storage.
//!
//! A [`Page`] is a passive, fixed 4096-byte container with a small header
//! (page id, pin count, dirty flag, record count, used-data size). It has no
//! I/O of its own; the `buffer` crate owns page residency and the `heap` and
//! `btree` crates own the byte layout written into a page's payload.

#[cfg(test)]
mod tests;

use common::PageId;

/// Fixed page size in bytes, matching `common::Config::page_size`.
pub const PAGE_SIZE: usize = 4096;

/// On-disk/in-buffer header prefixing every record in a heap page:
/// a 1-byte tombstone flag followed by a little-endian `i32` payload length.
pub const RECORD_HEADER_SIZE: usize = 5;

/// A single heap record's header, read from or about to be written to a
/// page's byte slice at a given offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordHeader {
    pub is_deleted: bool,
    pub record_size: i32,
}

impl RecordHeader {
    pub fn encode(self, dest: &mut [u8]) {
        dest[0] = self.is_deleted as u8;
        dest[1..5].copy_from_slice(&self.record_size.to_le_bytes());
    }

    pub fn decode(src: &[u8]) -> Self {
        Self {
            is_deleted: src[0] != 0,
            record_size: i32::from_le_bytes(src[1..5].try_into().unwrap()),
        }
    }
}

/// A fixed-size page. Owned by a buffer pool frame; never allocates or frees
/// its own storage after construction.
#[derive(Debug, Clone)]
pub struct Page {
    pub page_id: PageId,
    pub pin_count: i32,
    pub is_dirty: bool,
    pub record_count: i32,
    pub used_data_size: usize,
    data: Box<[u8; PAGE_SIZE]>,
}

impl Page {
    pub fn new(page_id: PageId) -> Self {
        Self {
            page_id,
            pin_count: 0,
            is_dirty: false,
            record_count: 0,
            used_data_size: 0,
            data: Box::new([0u8; PAGE_SIZE]),
        }
    }

    pub fn data(&self) -> &[u8; PAGE_SIZE] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        &mut self.data
    }

    /// `PAGE_SIZE - (record_count * sizeof(RecordHeader) + used_data_size)`.
    pub fn free_space(&self) -> usize {
        let used = self.record_count as usize * RECORD_HEADER_SIZE + self.used_data_size;
        PAGE_SIZE.saturating_sub(used)
    }

    pub fn can_fit(&self, payload_len: usize) -> bool {
        self.free_space() >= RECORD_HEADER_SIZE + payload_len
    }

    /// Zero the payload and clear metadata, re-binding the frame to a new
    /// page id. Used by the buffer pool when an evicted frame is recycled.
    pub fn reset(&mut self, page_id: PageId) {
        self.page_id = page_id;
        self.pin_count = 0;
        self.is_dirty = false;
        self.record_count = 0;
        self.used_data_size = 0;
        self.data.fill(0);
    }
}
