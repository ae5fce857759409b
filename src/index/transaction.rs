use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::RawRwLock;

use crate::buffer::{BufferPoolManager, Frame};
use crate::common::PageId;

pub(crate) type LatchReadGuard = ArcRwLockReadGuard<RawRwLock, ()>;
pub(crate) type LatchWriteGuard = ArcRwLockWriteGuard<RawRwLock, ()>;
/// Owned write guard over the root-id cell; doubles as the root latch.
pub(crate) type RootIdWriteGuard = ArcRwLockWriteGuard<RawRwLock, PageId>;

/// A pinned frame held under its shared tree latch. Dropping releases
/// the latch and then the pin.
pub(crate) struct ReadLatchedPage {
    bpm: Arc<BufferPoolManager>,
    page_id: PageId,
    frame: Arc<Frame>,
    guard: Option<LatchReadGuard>,
}

impl ReadLatchedPage {
    /// Takes the frame's shared latch (blocking) and adopts the pin the
    /// caller acquired via fetch/new_page.
    pub fn latch(bpm: Arc<BufferPoolManager>, page_id: PageId, frame: Arc<Frame>) -> Self {
        let guard = frame.latch().read_arc();
        Self {
            bpm,
            page_id,
            frame,
            guard: Some(guard),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }
}

impl Drop for ReadLatchedPage {
    fn drop(&mut self) {
        // Latch before pin, mirroring unlatch-then-unpin ordering.
        self.guard.take();
        self.bpm.unpin_page(self.page_id, false);
    }
}

/// A pinned frame held under its exclusive tree latch, remembering
/// whether the holder dirtied it. Dropping releases the latch and then
/// the pin with the recorded dirty flag.
pub(crate) struct WriteLatchedPage {
    bpm: Arc<BufferPoolManager>,
    page_id: PageId,
    frame: Arc<Frame>,
    guard: Option<LatchWriteGuard>,
    dirty: bool,
}

impl WriteLatchedPage {
    pub fn latch(bpm: Arc<BufferPoolManager>, page_id: PageId, frame: Arc<Frame>) -> Self {
        let guard = frame.latch().write_arc();
        Self {
            bpm,
            page_id,
            frame,
            guard: Some(guard),
            dirty: false,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn frame_arc(&self) -> Arc<Frame> {
        Arc::clone(&self.frame)
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

impl Drop for WriteLatchedPage {
    fn drop(&mut self) {
        self.guard.take();
        self.bpm.unpin_page(self.page_id, self.dirty);
    }
}

enum LatchEntry {
    /// Sentinel for the tree's root-id cell, held exclusively.
    RootCell(RootIdWriteGuard),
    Page(WriteLatchedPage),
}

/// Per-operation scratch carried through a tree call: the ordered set
/// of latches taken during the crabbing descent plus the pages
/// scheduled for deletion once the operation unwinds. Not durable
/// transactional state.
pub struct Transaction {
    page_set: VecDeque<LatchEntry>,
    deleted_page_set: Vec<PageId>,
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            page_set: VecDeque::new(),
            deleted_page_set: Vec::new(),
        }
    }

    pub(crate) fn add_root_cell(&mut self, guard: RootIdWriteGuard) {
        self.page_set.push_back(LatchEntry::RootCell(guard));
    }

    pub(crate) fn add_page(&mut self, page: WriteLatchedPage) {
        self.page_set.push_back(LatchEntry::Page(page));
    }

    /// Frame of a page whose latch this operation already holds.
    pub(crate) fn frame_of(&self, page_id: PageId) -> Option<Arc<Frame>> {
        self.page_set.iter().find_map(|entry| match entry {
            LatchEntry::Page(page) if page.page_id() == page_id => Some(page.frame_arc()),
            _ => None,
        })
    }

    pub(crate) fn mark_dirty(&mut self, page_id: PageId) {
        for entry in self.page_set.iter_mut() {
            if let LatchEntry::Page(page) = entry {
                if page.page_id() == page_id {
                    page.mark_dirty();
                    return;
                }
            }
        }
        panic!("mark_dirty on {page_id} which is not latched by this operation");
    }

    /// Rewrites the root id through the held root-cell guard.
    pub(crate) fn set_root_id(&mut self, root_id: PageId) {
        for entry in self.page_set.iter_mut() {
            if let LatchEntry::RootCell(guard) = entry {
                **guard = root_id;
                return;
            }
        }
        panic!("root-id cell is not latched by this operation");
    }

    /// Releases every held latch in acquisition order, unpinning pages
    /// with their recorded dirty flags. The crabbing release point.
    pub(crate) fn release_all(&mut self) {
        while let Some(entry) = self.page_set.pop_front() {
            drop(entry);
        }
    }

    pub(crate) fn add_deleted_page(&mut self, page_id: PageId) {
        self.deleted_page_set.push(page_id);
    }

    pub(crate) fn take_deleted_pages(&mut self) -> Vec<PageId> {
        std::mem::take(&mut self.deleted_page_set)
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}
