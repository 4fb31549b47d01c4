//! File-backed page store.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::Store;
use crate::page::PageId;
use crate::store::error::StoreError;

/// File-backed page store.
///
/// Pages are stored as contiguous `page_size` blocks in a single file:
///
/// ```text
/// +----------------+----------------+----------------+
/// | Page 0         | Page 1         | Page 2         | ...
/// +----------------+----------------+----------------+
/// ^ offset 0       ^ page_size      ^ 2 * page_size
/// ```
///
/// A mutex around the file handle serializes seek+read/write pairs.
/// Deallocated page ids are tombstoned in memory; the file keeps its
/// length so live page offsets stay stable.
pub struct FileStore {
    path: PathBuf,
    file: Mutex<File>,
    page_size: usize,
    /// Total pages ever allocated (file length in pages).
    allocated: AtomicU64,
    deallocated: Mutex<HashSet<u64>>,
}

impl FileStore {
    /// Opens or creates a store file at the given path.
    ///
    /// An existing file's page population is derived from its length.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupted`] if the file length is not a
    /// multiple of `page_size`.
    ///
    /// # Panics
    ///
    /// Panics if `page_size` is zero.
    pub fn open(path: impl Into<PathBuf>, page_size: usize) -> Result<Self, StoreError> {
        assert!(page_size > 0, "page_size must be > 0");
        let path = path.into();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let file_size = file.metadata()?.len();
        if file_size % page_size as u64 != 0 {
            return Err(StoreError::Corrupted(format!(
                "file size {} is not a multiple of page size {}",
                file_size, page_size
            )));
        }

        Ok(Self {
            path,
            file: Mutex::new(file),
            page_size,
            allocated: AtomicU64::new(file_size / page_size as u64),
            deallocated: Mutex::new(HashSet::new()),
        })
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn byte_offset(&self, page_id: PageId) -> u64 {
        page_id.page_num() * self.page_size as u64
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

    fn check_live(&self, page_id: PageId) -> Result<(), StoreError> {
        if !self.contains_page(page_id) {
            return Err(StoreError::NotFound(page_id));
        }
        Ok(())
    }
}

impl Store for FileStore {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn allocate_page(&self) -> Result<PageId, StoreError> {
        let mut file = self.file.lock();

        let page_num = self.allocated.load(Ordering::Acquire);
        let page_id = PageId::new(page_num);

        // extend the file with a zeroed page
        file.seek(SeekFrom::Start(self.byte_offset(page_id)))?;
        file.write_all(&vec![0u8; self.page_size])?;

        self.allocated.store(page_num + 1, Ordering::Release);
        Ok(page_id)
    }

    fn deallocate_page(&self, page_id: PageId) -> Result<(), StoreError> {
        self.check_live(page_id)?;
        self.deallocated.lock().insert(page_id.page_num());
        Ok(())
    }

    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<(), StoreError> {
        self.check_buf(buf)?;
        self.check_live(page_id)?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(self.byte_offset(page_id)))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<(), StoreError> {
        self.check_buf(buf)?;
        self.check_live(page_id)?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(self.byte_offset(page_id)))?;
        file.write_all(buf)?;
        Ok(())
    }

    fn contains_page(&self, page_id: PageId) -> bool {
        page_id.page_num() < self.allocated.load(Ordering::Acquire)
            && !self.deallocated.lock().contains(&page_id.page_num())
    }

    fn page_count(&self) -> u64 {
        self.allocated.load(Ordering::Acquire) - self.deallocated.lock().len() as u64
    }

    fn sync_all(&self) -> Result<(), StoreError> {
        let file = self.file.lock();
        file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PAGE_SIZE: usize = 512;

    #[test]
    fn test_create_new_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let store = FileStore::open(&path, PAGE_SIZE).unwrap();
        assert_eq!(store.page_count(), 0);
        assert!(path.exists());
        assert_eq!(store.path(), &path);
    }

    #[test]
    fn test_allocate_and_read() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path().join("test.db"), PAGE_SIZE).unwrap();
        let page_id = store.allocate_page().unwrap();

        let mut buf = [0u8; PAGE_SIZE];
        store.read_page(page_id, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_and_read() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path().join("test.db"), PAGE_SIZE).unwrap();
        let page_id = store.allocate_page().unwrap();

        let mut buf = [0u8; PAGE_SIZE];
        buf[0] = 0xAB;
        buf[PAGE_SIZE - 1] = 0xCD;
        store.write_page(page_id, &buf).unwrap();

        let mut read_buf = [0u8; PAGE_SIZE];
        store.read_page(page_id, &mut read_buf).unwrap();
        assert_eq!(read_buf[0], 0xAB);
        assert_eq!(read_buf[PAGE_SIZE - 1], 0xCD);
    }

    #[test]
    fn test_pages_land_at_their_offsets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let store = FileStore::open(&path, PAGE_SIZE).unwrap();

        let id0 = store.allocate_page().unwrap();
        let id1 = store.allocate_page().unwrap();

        let mut buf = [0u8; PAGE_SIZE];
        buf[0] = 1;
        store.write_page(id0, &buf).unwrap();
        buf[0] = 2;
        store.write_page(id1, &buf).unwrap();
        store.sync_all().unwrap();

        let raw = std::fs::read(&path).unwrap();
        assert_eq!(raw.len(), 2 * PAGE_SIZE);
        assert_eq!(raw[0], 1);
        assert_eq!(raw[PAGE_SIZE], 2);
    }

    #[test]
    fn test_corrupted_file_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        std::fs::write(&path, vec![0u8; 100]).unwrap();

        let result = FileStore::open(&path, PAGE_SIZE);
        assert!(matches!(result, Err(StoreError::Corrupted(_))));
    }

    #[test]
    fn test_page_not_found() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path().join("test.db"), PAGE_SIZE).unwrap();

        let mut buf = [0u8; PAGE_SIZE];
        let result = store.read_page(PageId::new(7), &mut buf);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_bad_buffer_size() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path().join("test.db"), PAGE_SIZE).unwrap();
        let page_id = store.allocate_page().unwrap();

        let buf = [0u8; PAGE_SIZE / 2];
        let result = store.write_page(page_id, &buf);
        assert!(matches!(result, Err(StoreError::BadSize { .. })));
    }

    #[test]
    fn test_deallocate_tombstones_page() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path().join("test.db"), PAGE_SIZE).unwrap();
        let page_id = store.allocate_page().unwrap();

        store.deallocate_page(page_id).unwrap();
        assert!(!store.contains_page(page_id));
        assert_eq!(store.page_count(), 0);

        let mut buf = [0u8; PAGE_SIZE];
        assert!(matches!(
            store.read_page(page_id, &mut buf),
            Err(StoreError::NotFound(_))
        ));

        // ids keep moving forward
        let next = store.allocate_page().unwrap();
        assert_ne!(next, page_id);
    }

    #[test]
    fn test_persistence_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let mut page_ids = Vec::new();

        {
            let store = FileStore::open(&path, PAGE_SIZE).unwrap();
            for i in 0..5u8 {
                let page_id = store.allocate_page().unwrap();
                let mut buf = [0u8; PAGE_SIZE];
                buf[0] = i * 10;
                store.write_page(page_id, &buf).unwrap();
                page_ids.push(page_id);
            }
            store.sync_all().unwrap();
        }

        {
            let store = FileStore::open(&path, PAGE_SIZE).unwrap();
            assert_eq!(store.page_count(), 5);
            for (i, &page_id) in page_ids.iter().enumerate() {
                let mut buf = [0u8; PAGE_SIZE];
                store.read_page(page_id, &mut buf).unwrap();
                assert_eq!(buf[0], i as u8 * 10);
            }
        }
    }
}
