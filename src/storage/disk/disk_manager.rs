use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::common::{PageId, Result, StrataError, HEADER_PAGE_ID, PAGE_SIZE};
use crate::storage::page::HeaderPageMut;

/// DiskManager is the blocking page store underneath the buffer pool.
/// One database file, addressed in PAGE_SIZE blocks by page id.
///
/// Page 0 is reserved for the header page and is formatted the first
/// time the file is created. Deallocated ids go into an in-memory free
/// set and are preferred by the allocator over growing the file.
pub struct DiskManager {
    file: Mutex<File>,
    db_path: PathBuf,
    /// Next never-allocated page id (file length in pages).
    next_page_id: AtomicU32,
    /// Ids handed back by deallocate_page, available for reuse.
    free_pages: Mutex<BTreeSet<PageId>>,
    num_reads: AtomicU32,
    num_writes: AtomicU32,
}

impl DiskManager {
    /// Opens the database file at `db_path`, creating and formatting it
    /// (header page at id 0) if it does not exist yet.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&db_path)?;

        let file_size = file.metadata()?.len();
        let num_pages = (file_size / PAGE_SIZE as u64) as u32;

        let dm = Self {
            file: Mutex::new(file),
            db_path,
            next_page_id: AtomicU32::new(num_pages.max(1)),
            free_pages: Mutex::new(BTreeSet::new()),
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        };

        if num_pages == 0 {
            dm.format_header_page()?;
        }

        Ok(dm)
    }

    fn format_header_page(&self) -> Result<()> {
        let mut data = [0u8; PAGE_SIZE];
        HeaderPageMut::new(&mut data).init();
        self.write_page(HEADER_PAGE_ID, &data)
    }

    /// Reads one page into the provided buffer. Pages past the current
    /// end of file read back as zeroes.
    pub fn read_page(&self, page_id: PageId, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE, "buffer must be PAGE_SIZE bytes");
        if !page_id.is_valid() {
            return Err(StrataError::InvalidPageId(page_id));
        }

        let byte_offset = page_id.as_u32() as u64 * PAGE_SIZE as u64;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(byte_offset))?;

        let mut read = 0;
        while read < PAGE_SIZE {
            match file.read(&mut data[read..])? {
                0 => break,
                n => read += n,
            }
        }
        data[read..].fill(0);

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes one page from the provided buffer.
    pub fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE, "buffer must be PAGE_SIZE bytes");
        if !page_id.is_valid() {
            return Err(StrataError::InvalidPageId(page_id));
        }

        let byte_offset = page_id.as_u32() as u64 * PAGE_SIZE as u64;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(byte_offset))?;
        file.write_all(data)?;
        file.flush()?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Hands out a page id, reusing a deallocated one when possible.
    /// The page is zeroed on disk so stale bytes never resurface.
    pub fn allocate_page(&self) -> Result<PageId> {
        let page_id = match self.free_pages.lock().pop_first() {
            Some(page_id) => page_id,
            None => PageId::new(self.next_page_id.fetch_add(1, Ordering::SeqCst)),
        };
        let zeros = [0u8; PAGE_SIZE];
        self.write_page(page_id, &zeros)?;
        tracing::trace!(target: "strata::disk", page = page_id.as_u32(), "allocated page");
        Ok(page_id)
    }

    /// Returns a page id to the allocator. The header page cannot be
    /// deallocated.
    pub fn deallocate_page(&self, page_id: PageId) -> Result<()> {
        if !page_id.is_valid() || page_id == HEADER_PAGE_ID {
            return Err(StrataError::InvalidPageId(page_id));
        }
        self.free_pages.lock().insert(page_id);
        Ok(())
    }

    /// Number of pages the file currently spans (allocated high-water mark).
    pub fn num_pages(&self) -> u32 {
        self.next_page_id.load(Ordering::Relaxed)
    }

    pub fn num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    pub fn num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn sync(&self) -> Result<()> {
        self.file.lock().sync_all()?;
        Ok(())
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        let _ = self.file.get_mut().sync_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_manager_creates_header_page() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let dm = DiskManager::new(&db_path).unwrap();
        assert!(db_path.exists());
        assert_eq!(dm.num_pages(), 1);

        // First data page comes after the header page.
        let page_id = dm.allocate_page().unwrap();
        assert_eq!(page_id, PageId::new(1));
    }

    #[test]
    fn test_disk_manager_read_write() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dm = DiskManager::new(temp_dir.path().join("rw.db")).unwrap();

        let page_id = dm.allocate_page().unwrap();

        let mut write_data = [0u8; PAGE_SIZE];
        write_data[0] = 42;
        write_data[PAGE_SIZE - 1] = 128;
        dm.write_page(page_id, &write_data).unwrap();

        let mut read_data = [0u8; PAGE_SIZE];
        dm.read_page(page_id, &mut read_data).unwrap();
        assert_eq!(read_data[0], 42);
        assert_eq!(read_data[PAGE_SIZE - 1], 128);
    }

    #[test]
    fn test_disk_manager_read_past_eof_zero_fills() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dm = DiskManager::new(temp_dir.path().join("eof.db")).unwrap();

        // Page 5 was never allocated or written; the file is one page long.
        let mut data = [0xAAu8; PAGE_SIZE];
        dm.read_page(PageId::new(5), &mut data).unwrap();
        assert!(data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_disk_manager_reuses_deallocated_pages() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dm = DiskManager::new(temp_dir.path().join("realloc.db")).unwrap();

        let a = dm.allocate_page().unwrap();
        let b = dm.allocate_page().unwrap();
        assert_ne!(a, b);

        dm.deallocate_page(a).unwrap();
        assert_eq!(dm.allocate_page().unwrap(), a);
    }

    #[test]
    fn test_disk_manager_rejects_header_page_deallocation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dm = DiskManager::new(temp_dir.path().join("hdr.db")).unwrap();
        assert!(dm.deallocate_page(HEADER_PAGE_ID).is_err());
    }

    #[test]
    fn test_disk_manager_persistence() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("persist.db");

        let page_id = {
            let dm = DiskManager::new(&db_path).unwrap();
            let page_id = dm.allocate_page().unwrap();
            let mut data = [0u8; PAGE_SIZE];
            data[0] = 123;
            dm.write_page(page_id, &data).unwrap();
            page_id
        };

        let dm = DiskManager::new(&db_path).unwrap();
        assert_eq!(dm.num_pages(), 2);

        let mut data = [0u8; PAGE_SIZE];
        dm.read_page(page_id, &mut data).unwrap();
        assert_eq!(data[0], 123);
    }
}
