use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{FrameId, PageId, PAGE_SIZE};

/// One slot of the buffer pool: page bytes plus the metadata that makes
/// the pool's invariants checkable (pin count, dirty bit, identity).
///
/// The `latch` field is the tree's crabbing latch. The buffer pool
/// never takes it; index code acquires it around a page's logical
/// lifetime and uses `read_data`/`write_data` for short byte-level
/// critical sections underneath it.
pub struct Frame {
    frame_id: FrameId,
    page_id: RwLock<PageId>,
    pin_count: AtomicU32,
    is_dirty: AtomicBool,
    latch: Arc<RwLock<()>>,
    data: RwLock<Box<[u8; PAGE_SIZE]>>,
}

impl Frame {
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            page_id: RwLock::new(PageId::INVALID),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
            latch: Arc::new(RwLock::new(())),
            data: RwLock::new(Box::new([0u8; PAGE_SIZE])),
        }
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    pub fn page_id(&self) -> PageId {
        *self.page_id.read()
    }

    pub(crate) fn set_page_id(&self, page_id: PageId) {
        *self.page_id.write() = page_id;
    }

    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    /// Increments the pin count, returning the new value.
    pub(crate) fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrements the pin count, returning the new value, or None if it
    /// was already zero.
    pub(crate) fn unpin(&self) -> Option<u32> {
        loop {
            let current = self.pin_count.load(Ordering::Acquire);
            if current == 0 {
                return None;
            }
            if self
                .pin_count
                .compare_exchange(current, current - 1, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return Some(current - 1);
            }
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Acquire)
    }

    pub(crate) fn set_dirty(&self, dirty: bool) {
        self.is_dirty.store(dirty, Ordering::Release);
    }

    /// The tree-side reader-writer latch for this frame. Cloned out as
    /// an `Arc` so owned guards can outlive the borrow of `self`.
    pub fn latch(&self) -> &Arc<RwLock<()>> {
        &self.latch
    }

    /// Short-lived shared access to the page bytes.
    pub fn read_data(&self) -> parking_lot::RwLockReadGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.data.read()
    }

    /// Short-lived exclusive access to the page bytes.
    pub fn write_data(&self) -> parking_lot::RwLockWriteGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.data.write()
    }

    pub(crate) fn copy_data_to(&self, out: &mut [u8]) {
        assert_eq!(out.len(), PAGE_SIZE);
        out.copy_from_slice(&self.data.read()[..]);
    }

    pub(crate) fn copy_data_from(&self, src: &[u8]) {
        assert_eq!(src.len(), PAGE_SIZE);
        self.data.write().copy_from_slice(src);
    }

    /// Returns the frame to its free-list state: no page, no pins, no
    /// dirt, zeroed bytes.
    pub(crate) fn reset(&self) {
        *self.page_id.write() = PageId::INVALID;
        self.pin_count.store(0, Ordering::Release);
        self.is_dirty.store(false, Ordering::Release);
        self.data.write().fill(0);
    }
}
