//! Page-oriented heap files.
//!
//! A [`HeapFile`] is a logical table stored as a sequence of pages, each
//! holding a packed, append-only run of records prefixed by a
//! [`storage::RecordHeader`]. There is no slot directory: a record's slot id
//! is its ordinal position within the page's record sequence. Every
//! `HeapFile` owns a private [`buffer::BufferPool`] and its own
//! monotonically increasing page-id counter.

#[cfg(test)]
mod tests;

use buffer::BufferPool;
use common::{DbError, DbResult, PageId, RecordId};
use storage::{PAGE_SIZE, RECORD_HEADER_SIZE, RecordHeader};
use tracing::{debug, warn};

/// An opaque record payload, stamped with its [`RecordId`] once read back
/// from a heap file.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Record {
    pub rid: RecordId,
    pub bytes: Vec<u8>,
}

impl Record {
    fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty() && !self.rid.is_valid()
    }
}

/// A table stored as an append-biased sequence of fixed-size pages.
pub struct HeapFile {
    pool: BufferPool,
    next_page_id: i32,
}

impl HeapFile {
    /// Create an empty heap file backed by a private buffer pool of
    /// `max_frames` frames.
    pub fn new(max_frames: usize) -> Self {
        Self {
            pool: BufferPool::new(max_frames),
            next_page_id: 0,
        }
    }

    /// Scan pages `0..next_page_id` in order and return the first whose
    /// free space fits `sizeof(RecordHeader) + payload_len`. Allocates a new
    /// page if none qualify.
    fn placement_page(&mut self, payload_len: usize) -> DbResult<PageId> {
        for raw in 0..self.next_page_id {
            let id = PageId(raw);
            let fits = {
                let page = self.pool.fetch_page(id)?;
                page.can_fit(payload_len)
            };
            self.pool.unpin_page(id, false)?;
            if fits {
                return Ok(id);
            }
        }
        let id = PageId(self.next_page_id);
        self.next_page_id += 1;
        Ok(id)
    }

    /// Append `bytes` to the first page with room, allocating a new page if
    /// necessary. Returns the new record's id.
    pub fn insert(&mut self, bytes: &[u8]) -> DbResult<RecordId> {
        let page_id = self.placement_page(bytes.len())?;
        let page = self.pool.fetch_page(page_id)?;

        if !page.can_fit(bytes.len()) {
            self.pool.unpin_page(page_id, false)?;
            return Err(DbError::NoFreeSpace(bytes.len()));
        }

        let offset = PAGE_SIZE - page.free_space();
        let header = RecordHeader {
            is_deleted: false,
            record_size: bytes.len() as i32,
        };
        let data = page.data_mut();
        header.encode(&mut data[offset..offset + RECORD_HEADER_SIZE]);
        data[offset + RECORD_HEADER_SIZE..offset + RECORD_HEADER_SIZE + bytes.len()]
            .copy_from_slice(bytes);

        page.record_count += 1;
        page.used_data_size += bytes.len();
        let rid = RecordId::new(page_id, page.record_count - 1);

        self.pool.unpin_page(page_id, true)?;
        debug!(page_id = page_id.0, slot = rid.slot, "inserted record");
        Ok(rid)
    }

    /// Walk a page's records from offset 0 up to and including `slot`,
    /// returning the byte range and tombstone flag of the slot's header.
    fn locate(
        page: &storage::Page,
        slot: i32,
    ) -> DbResult<(usize, RecordHeader)> {
        if slot < 0 || slot >= page.record_count {
            return Err(DbError::InvalidSlot(slot, page.page_id.0));
        }
        let data = page.data();
        let mut offset = 0usize;
        for i in 0..=slot {
            let header = RecordHeader::decode(&data[offset..offset + RECORD_HEADER_SIZE]);
            if i == slot {
                return Ok((offset, header));
            }
            offset += RECORD_HEADER_SIZE + header.record_size as usize;
        }
        unreachable!("slot bounds checked above")
    }

    /// Fetch the record at `rid`. Both out-of-range slots and tombstoned
    /// rows return an empty `Record` rather than an error, mirroring
    /// `heap_file.cpp::ReadRecord`, which logs and still returns an empty
    /// record rather than raising.
    pub fn read(&mut self, rid: RecordId) -> DbResult<Record> {
        let page = self.pool.fetch_page(rid.page_id)?;
        let result = match Self::locate(page, rid.slot) {
            Ok((offset, header)) => {
                if header.is_deleted {
                    Ok(Record::empty())
                } else {
                    let start = offset + RECORD_HEADER_SIZE;
                    let end = start + header.record_size as usize;
                    Ok(Record {
                        rid,
                        bytes: page.data()[start..end].to_vec(),
                    })
                }
            }
            Err(_) => Ok(Record::empty()),
        };
        self.pool.unpin_page(rid.page_id, false)?;
        result
    }

    /// Mark the record at `rid` as deleted without reclaiming its space.
    /// Returns `false` if the slot is out of range.
    pub fn delete(&mut self, rid: RecordId) -> DbResult<bool> {
        let page = self.pool.fetch_page(rid.page_id)?;
        let located = Self::locate(page, rid.slot);
        let deleted = match located {
            Ok((offset, mut header)) => {
                header.is_deleted = true;
                header.encode(&mut page.data_mut()[offset..offset + RECORD_HEADER_SIZE]);
                true
            }
            Err(_) => false,
        };
        self.pool.unpin_page(rid.page_id, deleted)?;
        if !deleted {
            warn!(page_id = rid.page_id.0, slot = rid.slot, "delete of invalid slot");
        }
        Ok(deleted)
    }

    /// Return every non-tombstoned record across all allocated pages, in
    /// page then slot order.
    pub fn seq_scan(&mut self) -> DbResult<Vec<Record>> {
        let mut records = Vec::new();
        for raw in 0..self.next_page_id {
            let page_id = PageId(raw);
            let page = self.pool.fetch_page(page_id)?;
            let data = page.data();
            let mut offset = 0usize;
            for slot in 0..page.record_count {
                let header = RecordHeader::decode(&data[offset..offset + RECORD_HEADER_SIZE]);
                if !header.is_deleted {
                    let start = offset + RECORD_HEADER_SIZE;
                    let end = start + header.record_size as usize;
                    records.push(Record {
                        rid: RecordId::new(page_id, slot),
                        bytes: data[start..end].to_vec(),
                    });
                }
                offset += RECORD_HEADER_SIZE + header.record_size as usize;
            }
            self.pool.unpin_page(page_id, false)?;
        }
        Ok(records)
    }
}
