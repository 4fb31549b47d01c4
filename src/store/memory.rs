//! In-memory page store.

use parking_lot::Mutex;

use super::Store;
use crate::page::{PageBuf, PageId};
use crate::store::error::StoreError;

/// In-memory page store for testing and development.
///
/// Pages live in a `Vec` of page-aligned buffers; a page's id is its
/// index. Deallocated pages leave a tombstone (`None`) behind so ids are
/// never reused.
pub struct MemoryStore {
    pages: Mutex<Vec<Option<PageBuf>>>,
    page_size: usize,
}

impl MemoryStore {
    /// Creates an empty store with the given page size.
    ///
    /// # Panics
    ///
    /// Panics if `page_size` is zero.
    pub fn new(page_size: usize) -> Self {
        assert!(page_size > 0, "page_size must be > 0");
        Self {
            pages: Mutex::new(Vec::new()),
            page_size,
        }
    }

    fn check_buf(&self, buf: &[u8]) -> Result<(), StoreError> {
        if buf.len() != self.page_size {
            return Err(StoreError::BadSize {
                expected: self.page_size,
                actual: buf.len(),
            });
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn allocate_page(&self) -> Result<PageId, StoreError> {
        let mut pages = self.pages.lock();
        let page_id = PageId::new(pages.len() as u64);
        pages.push(Some(PageBuf::zeroed(self.page_size)));
        Ok(page_id)
    }

    fn deallocate_page(&self, page_id: PageId) -> Result<(), StoreError> {
        let mut pages = self.pages.lock();
        let slot = pages
            .get_mut(page_id.page_num() as usize)
            .ok_or(StoreError::NotFound(page_id))?;
        if slot.take().is_none() {
            return Err(StoreError::NotFound(page_id));
        }
        Ok(())
    }

    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<(), StoreError> {
        self.check_buf(buf)?;

        let pages = self.pages.lock();
        let page = pages
            .get(page_id.page_num() as usize)
            .and_then(Option::as_ref)
            .ok_or(StoreError::NotFound(page_id))?;

        buf.copy_from_slice(page.as_slice());
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<(), StoreError> {
        self.check_buf(buf)?;

        let mut pages = self.pages.lock();
        let page = pages
            .get_mut(page_id.page_num() as usize)
            .and_then(Option::as_mut)
            .ok_or(StoreError::NotFound(page_id))?;

        page.as_mut_slice().copy_from_slice(buf);
        Ok(())
    }

    fn contains_page(&self, page_id: PageId) -> bool {
        let pages = self.pages.lock();
        pages
            .get(page_id.page_num() as usize)
            .is_some_and(Option::is_some)
    }

    fn page_count(&self) -> u64 {
        let pages = self.pages.lock();
        pages.iter().filter(|slot| slot.is_some()).count() as u64
    }

    fn sync_all(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::DEFAULT_PAGE_SIZE;

    #[test]
    fn test_allocate_and_read() {
        let store = MemoryStore::new(DEFAULT_PAGE_SIZE);
        let page_id = store.allocate_page().unwrap();
        let mut buf = vec![0u8; DEFAULT_PAGE_SIZE];
        store.read_page(page_id, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_and_read() {
        let store = MemoryStore::new(DEFAULT_PAGE_SIZE);
        let page_id = store.allocate_page().unwrap();

        let mut write_buf = vec![0u8; DEFAULT_PAGE_SIZE];
        write_buf[0] = 42;
        write_buf[100] = 99;
        store.write_page(page_id, &write_buf).unwrap();

        let mut read_buf = vec![0u8; DEFAULT_PAGE_SIZE];
        store.read_page(page_id, &mut read_buf).unwrap();
        assert_eq!(read_buf[0], 42);
        assert_eq!(read_buf[100], 99);
    }

    #[test]
    fn test_page_not_found() {
        let store = MemoryStore::new(DEFAULT_PAGE_SIZE);
        let mut buf = vec![0u8; DEFAULT_PAGE_SIZE];
        let result = store.read_page(PageId::new(999), &mut buf);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_bad_buffer_size() {
        let store = MemoryStore::new(DEFAULT_PAGE_SIZE);
        let page_id = store.allocate_page().unwrap();
        let mut buf = vec![0u8; 100];
        let result = store.read_page(page_id, &mut buf);
        assert!(matches!(result, Err(StoreError::BadSize { .. })));
    }

    #[test]
    fn test_deallocate() {
        let store = MemoryStore::new(64);
        let page_id = store.allocate_page().unwrap();
        assert!(store.contains_page(page_id));

        store.deallocate_page(page_id).unwrap();
        assert!(!store.contains_page(page_id));
        assert_eq!(store.page_count(), 0);

        let mut buf = vec![0u8; 64];
        assert!(matches!(
            store.read_page(page_id, &mut buf),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.deallocate_page(page_id),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_ids_not_reused_after_deallocate() {
        let store = MemoryStore::new(64);
        let id0 = store.allocate_page().unwrap();
        store.deallocate_page(id0).unwrap();

        let id1 = store.allocate_page().unwrap();
        assert_ne!(id0, id1);
        assert!(!store.contains_page(id0));
        assert!(store.contains_page(id1));
    }

    #[test]
    fn test_page_count() {
        let store = MemoryStore::new(64);
        assert_eq!(store.page_count(), 0);

        let id0 = store.allocate_page().unwrap();
        store.allocate_page().unwrap();
        assert_eq!(store.page_count(), 2);

        store.deallocate_page(id0).unwrap();
        assert_eq!(store.page_count(), 1);
    }

    #[test]
    fn test_sync_all() {
        let store = MemoryStore::new(64);
        store.sync_all().unwrap();
    }
}
