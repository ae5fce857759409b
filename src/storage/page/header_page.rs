use crate::common::{PageId, PAGE_SIZE};

const MAGIC_NUMBER: u32 = 0x53545241; // "STRA"
const MAGIC_OFFSET: usize = 0;
const RECORD_COUNT_OFFSET: usize = 4;
const RECORDS_OFFSET: usize = 8;

/// Record layout: NUL-padded name followed by the root page id.
const NAME_LEN: usize = 32;
const RECORD_SIZE: usize = NAME_LEN + 4;
const MAX_RECORDS: usize = (PAGE_SIZE - RECORDS_OFFSET) / RECORD_SIZE;

fn record_offset(index: usize) -> usize {
    RECORDS_OFFSET + index * RECORD_SIZE
}

fn encode_name(name: &str) -> [u8; NAME_LEN] {
    let bytes = name.as_bytes();
    assert!(bytes.len() <= NAME_LEN, "index name longer than {NAME_LEN} bytes");
    let mut out = [0u8; NAME_LEN];
    out[..bytes.len()].copy_from_slice(bytes);
    out
}

/// Read-only view of the header page: the append-only table of
/// `index_name -> root_page_id` records living at page 0.
pub struct HeaderPage<'a> {
    data: &'a [u8],
}

impl<'a> HeaderPage<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        Self { data }
    }

    pub fn is_valid(&self) -> bool {
        self.magic() == MAGIC_NUMBER
    }

    fn magic(&self) -> u32 {
        u32::from_le_bytes(self.data[MAGIC_OFFSET..MAGIC_OFFSET + 4].try_into().unwrap())
    }

    pub fn record_count(&self) -> usize {
        u32::from_le_bytes(
            self.data[RECORD_COUNT_OFFSET..RECORD_COUNT_OFFSET + 4]
                .try_into()
                .unwrap(),
        ) as usize
    }

    fn find_record(&self, name: &str) -> Option<usize> {
        let needle = encode_name(name);
        (0..self.record_count()).find(|&i| {
            let off = record_offset(i);
            self.data[off..off + NAME_LEN] == needle
        })
    }

    /// Looks up the root page id registered under `name`.
    pub fn get_root_id(&self, name: &str) -> Option<PageId> {
        self.find_record(name).map(|i| {
            let off = record_offset(i) + NAME_LEN;
            PageId::from_le_bytes(self.data[off..off + 4].try_into().unwrap())
        })
    }
}

/// Mutable view of the header page.
pub struct HeaderPageMut<'a> {
    data: &'a mut [u8],
}

impl<'a> HeaderPageMut<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        Self { data }
    }

    pub fn init(&mut self) {
        self.data.fill(0);
        self.data[MAGIC_OFFSET..MAGIC_OFFSET + 4].copy_from_slice(&MAGIC_NUMBER.to_le_bytes());
        self.set_record_count(0);
    }

    fn as_view(&self) -> HeaderPage<'_> {
        HeaderPage::new(&self.data[..])
    }

    pub fn is_valid(&self) -> bool {
        self.as_view().is_valid()
    }

    pub fn record_count(&self) -> usize {
        self.as_view().record_count()
    }

    pub fn get_root_id(&self, name: &str) -> Option<PageId> {
        self.as_view().get_root_id(name)
    }

    fn set_record_count(&mut self, count: usize) {
        self.data[RECORD_COUNT_OFFSET..RECORD_COUNT_OFFSET + 4]
            .copy_from_slice(&(count as u32).to_le_bytes());
    }

    fn write_record(&mut self, index: usize, name: &str, root_id: PageId) {
        let off = record_offset(index);
        self.data[off..off + NAME_LEN].copy_from_slice(&encode_name(name));
        self.data[off + NAME_LEN..off + RECORD_SIZE].copy_from_slice(&root_id.to_le_bytes());
    }

    /// Appends a record. Returns false when the name already exists or
    /// the page is full.
    pub fn insert_record(&mut self, name: &str, root_id: PageId) -> bool {
        let count = self.record_count();
        if count >= MAX_RECORDS || self.as_view().find_record(name).is_some() {
            return false;
        }
        self.write_record(count, name, root_id);
        self.set_record_count(count + 1);
        true
    }

    /// Rewrites the root id of an existing record. Returns false when
    /// the name is not registered.
    pub fn update_record(&mut self, name: &str, root_id: PageId) -> bool {
        match self.as_view().find_record(name) {
            Some(i) => {
                let off = record_offset(i) + NAME_LEN;
                self.data[off..off + 4].copy_from_slice(&root_id.to_le_bytes());
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_page() -> [u8; PAGE_SIZE] {
        let mut data = [0u8; PAGE_SIZE];
        HeaderPageMut::new(&mut data).init();
        data
    }

    #[test]
    fn test_header_page_init() {
        let data = fresh_page();
        let page = HeaderPage::new(&data);
        assert!(page.is_valid());
        assert_eq!(page.record_count(), 0);
        assert_eq!(page.get_root_id("orders_pk"), None);
    }

    #[test]
    fn test_header_page_insert_and_lookup() {
        let mut data = fresh_page();
        let mut page = HeaderPageMut::new(&mut data);

        assert!(page.insert_record("orders_pk", PageId::new(7)));
        assert!(page.insert_record("users_pk", PageId::INVALID));
        assert_eq!(page.record_count(), 2);

        let view = HeaderPage::new(&data);
        assert_eq!(view.get_root_id("orders_pk"), Some(PageId::new(7)));
        assert_eq!(view.get_root_id("users_pk"), Some(PageId::INVALID));
    }

    #[test]
    fn test_header_page_duplicate_insert_rejected() {
        let mut data = fresh_page();
        let mut page = HeaderPageMut::new(&mut data);

        assert!(page.insert_record("orders_pk", PageId::new(7)));
        assert!(!page.insert_record("orders_pk", PageId::new(8)));
        assert_eq!(page.get_root_id("orders_pk"), Some(PageId::new(7)));
    }

    #[test]
    fn test_header_page_update() {
        let mut data = fresh_page();
        let mut page = HeaderPageMut::new(&mut data);

        assert!(!page.update_record("orders_pk", PageId::new(9)));
        assert!(page.insert_record("orders_pk", PageId::new(7)));
        assert!(page.update_record("orders_pk", PageId::new(9)));
        assert_eq!(page.get_root_id("orders_pk"), Some(PageId::new(9)));
    }

    #[test]
    fn test_header_page_fills_up() {
        let mut data = fresh_page();
        let mut page = HeaderPageMut::new(&mut data);

        for i in 0..MAX_RECORDS {
            assert!(page.insert_record(&format!("idx_{i}"), PageId::new(i as u32)));
        }
        assert!(!page.insert_record("one_too_many", PageId::new(0)));
    }
}
