//! Buffer pool manager for page-level caching.
//!
//! A [`BufferPool`] mediates all access to [`Page`]s under a fixed capacity,
//! evicting the least-recently-used unpinned frame when capacity is
//! exceeded. Callers obtain pages through matched `fetch_page`/`unpin_page`
//! pairs; a page handle returned by `fetch_page` must not outlive the next
//! call into the same pool, which this crate's own call sites (and those in
//! `heap`/`btree`) satisfy structurally since every borrow is dropped before
//! the matching `unpin_page`.
//!
//! Each [`heap::HeapFile`](../heap/index.html) and each
//! [`btree::BTreeIndex`](../btree/index.html) owns a private `BufferPool`
//! instance; there is no cross-table sharing of page-id space.


use common::{DbError, DbResult, PageId};
use hashbrown::HashMap;
use std::collections::VecDeque;
use storage::Page;
use tracing::{debug, error, warn};

/// A resident page plus the bookkeeping the pool needs to decide eviction.
#[derive(Debug)]
struct Frame {
    page: Page,
    pin_count: i32,
    is_dirty: bool,
}

/// Bounded cache of pages, keyed by [`PageId`], with LRU eviction among
/// unpinned frames.
///
/// Not internally thread-safe: every method takes `&mut self`. A caller that
/// needs cross-thread access wraps an instance in `std::sync::Mutex` and
/// holds the lock for the duration of each call.
#[derive(Debug)]
pub struct BufferPool {
    max_frames: usize,
    frames: HashMap<PageId, Frame>,
    /// Recency list, most-recently-used at the front.
    recency: VecDeque<PageId>,
}

impl BufferPool {
    /// Create a pool holding at most `max_frames` resident pages.
    ///
    /// # Panics
    /// Panics if `max_frames` is 0.
    pub fn new(max_frames: usize) -> Self {
        assert!(max_frames > 0, "max_frames must be > 0");
        Self {
            max_frames,
            frames: HashMap::new(),
            recency: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn touch(&mut self, id: PageId) {
        self.recency.retain(|&p| p != id);
        self.recency.push_front(id);
    }

    /// Evict the first unpinned frame walking from the LRU (back) end,
    /// flushing it first if dirty. Returns an error if every frame is
    /// pinned.
    fn evict_one(&mut self) -> DbResult<()> {
        let victim = self
            .recency
            .iter()
            .rev()
            .find(|&&id| self.frames.get(&id).is_some_and(|f| f.pin_count == 0))
            .copied();

        let Some(victim) = victim else {
            return Err(DbError::AllFramesPinned);
        };

        if self.frames.get(&victim).is_some_and(|f| f.is_dirty) {
            self.flush_page(victim)?;
        }
        self.frames.remove(&victim);
        self.recency.retain(|&p| p != victim);
        debug!(page_id = victim.0, "evicted frame");
        Ok(())
    }

    /// Return a mutable reference to the resident page for `id`, loading a
    /// fresh (zeroed) page and pinning it if absent. Evicts one frame first
    /// if the pool is at capacity and `id` is not already resident.
    pub fn fetch_page(&mut self, id: PageId) -> DbResult<&mut Page> {
        if self.frames.contains_key(&id) {
            self.touch(id);
            let frame = self.frames.get_mut(&id).unwrap();
            frame.pin_count += 1;
            debug!(page_id = id.0, pin_count = frame.pin_count, "fetch hit");
            return Ok(&mut frame.page);
        }

        if self.frames.len() >= self.max_frames {
            self.evict_one()?;
        }

        debug!(page_id = id.0, "fetch miss");
        self.frames.insert(
            id,
            Frame {
                page: Page::new(id),
                pin_count: 1,
                is_dirty: false,
            },
        );
        self.touch(id);
        Ok(&mut self.frames.get_mut(&id).unwrap().page)
    }

    /// Decrement the pin count for `id` (never below zero); mark it dirty if
    /// `dirty` is true. Logs and no-ops if `id` is not resident.
    pub fn unpin_page(&mut self, id: PageId, dirty: bool) -> DbResult<()> {
        let Some(frame) = self.frames.get_mut(&id) else {
            error!(page_id = id.0, "unpin of non-resident page");
            return Ok(());
        };
        if frame.pin_count > 0 {
            frame.pin_count -= 1;
        }
        if dirty {
            frame.is_dirty = true;
        }
        Ok(())
    }

    /// Clear the dirty flag for a resident, dirty page. No-op if clean.
    /// Logs and no-ops if `id` is not resident.
    pub fn flush_page(&mut self, id: PageId) -> DbResult<()> {
        let Some(frame) = self.frames.get_mut(&id) else {
            error!(page_id = id.0, "flush of non-resident page");
            return Ok(());
        };
        if frame.is_dirty {
            frame.is_dirty = false;
        }
        Ok(())
    }

    /// Total pin count across all resident frames. Used by tests to verify
    /// every fetch has a matching unpin.
    pub fn total_pins(&self) -> i32 {
        self.frames.values().map(|f| f.pin_count).sum()
    }

    pub fn is_resident(&self, id: PageId) -> bool {
        self.frames.contains_key(&id)
    }

    pub fn pin_count(&self, id: PageId) -> Option<i32> {
        self.frames.get(&id).map(|f| f.pin_count)
    }

    pub fn is_dirty(&self, id: PageId) -> Option<bool> {
        self.frames.get(&id).map(|f| f.is_dirty)
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        let dirty: Vec<PageId> = self
            .frames
            .iter()
            .filter(|(_, f)| f.is_dirty)
            .map(|(&id, _)| id)
            .collect();
        if !dirty.is_empty() {
            warn!(count = dirty.len(), "buffer pool dropped with dirty frames");
        }
    }
}
