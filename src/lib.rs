//! In-memory buffer pool over page-addressed storage.
//!
//! The pool caches fixed-size pages from a backing [`Store`] in a fixed
//! number of in-memory frames. Clients pin pages through RAII guards;
//! pinned pages are never evicted or overwritten. Dirty pages are written
//! back before their frame is reused, and frame reuse follows an LRU
//! policy restricted to unpinned frames.
//!
//! # Architecture
//!
//! ```text
//! +-------------------+
//! |  Higher layers    |   (table heaps, indexes, ...)
//! +-------------------+
//!          |
//!          v
//! +-------------------+
//! |     PagePool      |   page directory, free list, replacer
//! +-------------------+
//!          |
//!          v
//! +-------------------+
//! |   Store (trait)   |   MemoryStore / FileStore
//! +-------------------+
//! ```
//!
//! # Example
//!
//! ```
//! use pagepool::{LruReplacer, MemoryStore, PagePool, PoolConfig};
//!
//! let config = PoolConfig { pool_size: 8, page_size: 512 };
//! let store = MemoryStore::new(config.page_size);
//! let pool = PagePool::new(store, LruReplacer::new(), config).unwrap();
//!
//! let page_id = {
//!     let mut guard = pool.new_page().unwrap();
//!     guard.data_mut()[0..5].copy_from_slice(b"hello");
//!     guard.page_id()
//! }; // dropping the guard unpins the page and records the modification
//!
//! let guard = pool.fetch_page(page_id).unwrap();
//! assert_eq!(&guard.data()[0..5], b"hello");
//! ```

pub mod buffer;
pub mod page;
pub mod store;

pub use buffer::{
    FrameId, LruReplacer, PagePool, PinnedPage, PinnedPageMut, PoolConfig, PoolError, Replacer,
};
pub use page::{DEFAULT_PAGE_SIZE, PageBuf, PageId};
pub use store::{FileStore, MemoryStore, Store, StoreError};
