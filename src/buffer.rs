//! Buffer pool: page caching with pin-based eviction control.
//!
//! [`PagePool`] keeps a fixed number of in-memory frames and maps pages
//! from a [`Store`](crate::store::Store) into them on demand. Access goes
//! through RAII pin guards; a pinned page is never evicted and its frame
//! is never rebound. When every frame is occupied, an unpinned victim is
//! chosen by the [`Replacer`] policy and written back first if dirty.
//!
//! # Example
//!
//! ```
//! use pagepool::{LruReplacer, MemoryStore, PagePool, PoolConfig};
//!
//! let config = PoolConfig { pool_size: 4, page_size: 256 };
//! let store = MemoryStore::new(config.page_size);
//! let pool = PagePool::new(store, LruReplacer::new(), config).unwrap();
//!
//! let mut guard = pool.new_page().unwrap();
//! guard.data_mut()[0] = 7;
//! let page_id = guard.page_id();
//! drop(guard); // unpins; the write reaches the store on evict or flush
//!
//! pool.flush_page(page_id).unwrap();
//! ```

mod error;
mod frame;
mod guard;
mod pool;
mod replacer;

pub use error::PoolError;
pub use frame::FrameId;
pub use guard::{PinnedPage, PinnedPageMut};
pub use pool::{PagePool, PoolConfig};
pub use replacer::{LruReplacer, Replacer};
