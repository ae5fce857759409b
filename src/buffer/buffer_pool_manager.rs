use std::collections::{HashMap, LinkedList};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::{FrameId, PageId, Result, StrataError, PAGE_SIZE};
use crate::storage::disk::{DiskManager, DiskScheduler};

use super::{Frame, LruKReplacer};

/// Page table and free list, serialized together under one mutex.
struct PoolInner {
    page_table: HashMap<PageId, FrameId>,
    free_list: LinkedList<FrameId>,
}

/// BufferPoolManager owns a fixed array of frames and moves pages
/// between them and disk. Every public operation runs atomically under
/// the coarse pool mutex; disk I/O happens while it is held, which is
/// the accepted simplification for this engine.
///
/// A frame is always in exactly one of three states: on the free list,
/// mapped with pin > 0 and non-evictable, or mapped with pin == 0 and
/// evictable.
pub struct BufferPoolManager {
    pool_size: usize,
    frames: Vec<Arc<Frame>>,
    inner: Mutex<PoolInner>,
    replacer: LruKReplacer,
    disk_scheduler: DiskScheduler,
}

impl BufferPoolManager {
    pub fn new(pool_size: usize, k: usize, disk_manager: Arc<DiskManager>) -> Self {
        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = LinkedList::new();
        for i in 0..pool_size {
            let frame_id = FrameId::new(i as u32);
            frames.push(Arc::new(Frame::new(frame_id)));
            free_list.push_back(frame_id);
        }

        Self {
            pool_size,
            frames,
            inner: Mutex::new(PoolInner {
                page_table: HashMap::new(),
                free_list,
            }),
            replacer: LruKReplacer::new(k, pool_size),
            disk_scheduler: DiskScheduler::new(disk_manager),
        }
    }

    /// Allocates a fresh page and pins it into a frame with zeroed
    /// bytes. Fails with NoFreeFrame when every frame is pinned.
    pub fn new_page(&self) -> Result<(PageId, Arc<Frame>)> {
        let mut inner = self.inner.lock();
        let frame_id = self.acquire_frame(&mut inner)?;
        let frame = &self.frames[frame_id.as_usize()];

        let page_id = self.disk_scheduler.disk_manager().allocate_page()?;
        frame.set_page_id(page_id);
        frame.pin();

        inner.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id);
        self.replacer.set_evictable(frame_id, false);

        Ok((page_id, Arc::clone(frame)))
    }

    /// Brings `page_id` into memory (if needed) and pins it. The caller
    /// owes exactly one `unpin_page` for every successful fetch.
    pub fn fetch_page(&self, page_id: PageId) -> Result<Arc<Frame>> {
        if !page_id.is_valid() {
            return Err(StrataError::InvalidPageId(page_id));
        }

        let mut inner = self.inner.lock();
        if let Some(&frame_id) = inner.page_table.get(&page_id) {
            let frame = &self.frames[frame_id.as_usize()];
            frame.pin();
            self.replacer.record_access(frame_id);
            self.replacer.set_evictable(frame_id, false);
            return Ok(Arc::clone(frame));
        }

        let frame_id = self.acquire_frame(&mut inner)?;
        let frame = &self.frames[frame_id.as_usize()];

        let mut data = [0u8; PAGE_SIZE];
        self.disk_scheduler.read_sync(page_id, &mut data)?;
        frame.copy_data_from(&data);
        frame.set_page_id(page_id);
        frame.set_dirty(false);
        frame.pin();

        inner.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id);
        self.replacer.set_evictable(frame_id, false);

        Ok(Arc::clone(frame))
    }

    /// Drops one pin. Returns false when the page is not resident or
    /// was not pinned. The dirty bit only ever accumulates here.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let inner = self.inner.lock();
        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return false;
        };
        let frame = &self.frames[frame_id.as_usize()];
        if is_dirty {
            frame.set_dirty(true);
        }
        match frame.unpin() {
            Some(0) => {
                self.replacer.set_evictable(frame_id, true);
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Writes a resident page back to disk (dirty or not) and clears
    /// its dirty bit. Returns false when the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        if !page_id.is_valid() {
            return Err(StrataError::InvalidPageId(page_id));
        }
        let inner = self.inner.lock();
        self.flush_locked(&inner, page_id)
    }

    fn flush_locked(&self, inner: &PoolInner, page_id: PageId) -> Result<bool> {
        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return Ok(false);
        };
        let frame = &self.frames[frame_id.as_usize()];

        let mut data = [0u8; PAGE_SIZE];
        frame.copy_data_to(&mut data);
        self.disk_scheduler.write_sync(page_id, &data)?;
        frame.set_dirty(false);
        Ok(true)
    }

    /// Flushes every resident page.
    pub fn flush_all_pages(&self) -> Result<()> {
        let inner = self.inner.lock();
        let page_ids: Vec<PageId> = inner.page_table.keys().copied().collect();
        for page_id in page_ids {
            self.flush_locked(&inner, page_id)?;
        }
        Ok(())
    }

    /// Evicts `page_id` from the pool and returns its id to the disk
    /// allocator. True when the page was removed or was never resident;
    /// false when it is pinned.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut inner = self.inner.lock();
        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return Ok(true);
        };
        let frame = &self.frames[frame_id.as_usize()];
        if frame.pin_count() > 0 {
            return Ok(false);
        }

        inner.page_table.remove(&page_id);
        self.replacer.remove(frame_id);
        frame.reset();
        inner.free_list.push_back(frame_id);
        self.disk_scheduler.disk_manager().deallocate_page(page_id)?;
        tracing::debug!(target: "strata::pool", page = page_id.as_u32(), "deleted page");
        Ok(true)
    }

    /// Pin count of a resident page, for tests and assertions.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let inner = self.inner.lock();
        inner
            .page_table
            .get(&page_id)
            .map(|frame_id| self.frames[frame_id.as_usize()].pin_count())
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn free_frame_count(&self) -> usize {
        self.inner.lock().free_list.len()
    }

    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        self.disk_scheduler.disk_manager()
    }

    /// Takes a frame from the free list, or evicts a victim (writing it
    /// back if dirty). The returned frame is reset and unmapped.
    fn acquire_frame(&self, inner: &mut PoolInner) -> Result<FrameId> {
        if let Some(frame_id) = inner.free_list.pop_front() {
            return Ok(frame_id);
        }

        let Some(frame_id) = self.replacer.evict() else {
            return Err(StrataError::NoFreeFrame);
        };
        let frame = &self.frames[frame_id.as_usize()];
        let old_page_id = frame.page_id();

        if frame.is_dirty() {
            let mut data = [0u8; PAGE_SIZE];
            frame.copy_data_to(&mut data);
            self.disk_scheduler.write_sync(old_page_id, &data)?;
        }
        tracing::trace!(
            target: "strata::pool",
            frame = frame_id.0,
            page = old_page_id.as_u32(),
            "evicted page from frame"
        );

        inner.page_table.remove(&old_page_id);
        frame.reset();
        Ok(frame_id)
    }
}
