//! The buffer pool manager.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::error::PoolError;
use super::frame::{Frame, FrameId, FrameMeta};
use super::guard::{PinnedPage, PinnedPageMut};
use super::replacer::Replacer;
use crate::page::{DEFAULT_PAGE_SIZE, PageId};
use crate::store::Store;

/// Configuration for a [`PagePool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of frames in the pool. This bounds how many pages can be
    /// cached (and pinned) at once.
    pub pool_size: usize,

    /// Page size in bytes. Must match the backing store's page size.
    pub page_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: 1024, // 1024 * 8KB = 8MB
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Buffer pool manager: a fixed-size write-back cache of store pages.
///
/// The pool owns `pool_size` frames, a page directory mapping resident
/// pages to frames, a free list, and a replacement policy over unpinned
/// frames. The five operations — fetch, new, unpin, delete, flush — keep
/// one another honest through a small set of invariants that hold
/// whenever the state lock is free:
///
/// - every frame is in exactly one of {free list, resident-and-pinned,
///   resident-and-evictable}
/// - a frame is tracked by the replacer iff it holds a page and its pin
///   count is zero
/// - the page directory is exactly the set of resident pages
///
/// Debug builds assert these after every mutating operation.
///
/// # Locking
///
/// A single mutex guards the directory, free list, replacer, and all
/// frame metadata, and stays held across store calls; store I/O therefore
/// serializes the pool, trading throughput for a simple correctness
/// argument. Each frame's byte buffer sits behind its own `RwLock` so
/// pinning clients can read and write page data without the state lock.
///
/// Lock order is strict: state lock before frame latch, never the
/// reverse. Guards release their latch before re-entering the pool to
/// unpin. The pool only ever latches frames that cannot have outstanding
/// guards (unpinned victims, freshly taken frames, or flush reads that
/// may wait for a writer to finish).
///
/// # Thread safety
///
/// All operations take `&self`; share the pool across threads with
/// `Arc<PagePool<..>>`.
pub struct PagePool<S: Store, R: Replacer> {
    store: S,

    /// Frame data slots. The Vec is immutable after construction; each
    /// slot has its own latch.
    frames: Vec<Frame>,

    /// Directory, free list, replacer, and per-frame metadata.
    state: Mutex<PoolState<R>>,

    config: PoolConfig,
}

struct PoolState<R: Replacer> {
    /// Maps resident pages to their frames.
    page_table: HashMap<PageId, FrameId>,

    /// Metadata for each frame, indexed by `FrameId`.
    metas: Vec<FrameMeta>,

    /// Frames holding no page.
    free_list: Vec<FrameId>,

    /// Eviction policy over unpinned resident frames.
    replacer: R,
}

impl<S: Store, R: Replacer> PagePool<S, R> {
    /// Creates a new pool over `store` with the given replacement policy.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::BadConfig`] when `pool_size` or `page_size`
    /// is zero, or when `page_size` differs from the store's.
    pub fn new(store: S, replacer: R, config: PoolConfig) -> Result<Self, PoolError> {
        if config.pool_size == 0 {
            return Err(PoolError::BadConfig("pool_size must be > 0".into()));
        }
        if config.page_size == 0 {
            return Err(PoolError::BadConfig("page_size must be > 0".into()));
        }
        if config.page_size != store.page_size() {
            return Err(PoolError::BadConfig(format!(
                "page_size {} does not match the store's page size {}",
                config.page_size,
                store.page_size()
            )));
        }

        let frames = (0..config.pool_size)
            .map(|_| Frame::new(config.page_size))
            .collect();
        let metas = (0..config.pool_size).map(|_| FrameMeta::new()).collect();
        let free_list = (0..config.pool_size).map(FrameId::new).collect();

        Ok(Self {
            store,
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::with_capacity(config.pool_size),
                metas,
                free_list,
                replacer,
            }),
            config,
        })
    }

    /// Returns the number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.config.pool_size
    }

    /// Returns the configured page size in bytes.
    pub fn page_size(&self) -> usize {
        self.config.page_size
    }

    /// Returns the backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the number of pages currently resident in the pool.
    pub fn resident_count(&self) -> usize {
        self.state.lock().page_table.len()
    }

    /// Returns true if the page is currently cached in a frame.
    pub fn is_resident(&self, page_id: PageId) -> bool {
        self.state.lock().page_table.contains_key(&page_id)
    }

    /// Fetches a page for reading.
    ///
    /// The returned guard pins the page: it stays resident, with content
    /// equal to the store's (modulo writers holding their own pins),
    /// until every guard on it is dropped. Any number of read guards may
    /// coexist on one page.
    ///
    /// # Errors
    ///
    /// - [`PoolError::PageNotFound`] if the store has no such page
    /// - [`PoolError::NoFreeFrames`] if the page is not resident and
    ///   every frame is pinned
    /// - [`PoolError::Store`] if store I/O fails
    pub fn fetch_page(&self, page_id: PageId) -> Result<PinnedPage<'_, S, R>, PoolError> {
        let frame_id = self.pin_frame(page_id)?;
        let data = self.frames[frame_id.index()].data.read();
        Ok(PinnedPage::new(self, frame_id, page_id, data))
    }

    /// Fetches a page for writing.
    ///
    /// Same contract as [`fetch_page`](Self::fetch_page), but the guard
    /// holds the frame's latch exclusively and reports modifications into
    /// the frame's sticky dirty bit.
    pub fn fetch_page_mut(&self, page_id: PageId) -> Result<PinnedPageMut<'_, S, R>, PoolError> {
        let frame_id = self.pin_frame(page_id)?;
        let data = self.frames[frame_id.index()].data.write();
        Ok(PinnedPageMut::new(self, frame_id, page_id, data))
    }

    /// Allocates a fresh store page and returns it pinned with zeroed
    /// content.
    ///
    /// A frame is secured *before* the store allocation, so a full pool
    /// fails with [`PoolError::NoFreeFrames`] without burning a page id.
    pub fn new_page(&self) -> Result<PinnedPageMut<'_, S, R>, PoolError> {
        let (frame_id, page_id) = {
            let mut state = self.state.lock();
            let frame_id = self.take_frame(&mut state)?;

            let page_id = match self.store.allocate_page() {
                Ok(page_id) => page_id,
                Err(e) => {
                    state.free_list.push(frame_id);
                    self.debug_validate(&state);
                    return Err(e.into());
                }
            };

            // zero before the directory insert makes the page visible;
            // the frame may carry a previous occupant's bytes
            self.frames[frame_id.index()].data.write().zero();
            state.page_table.insert(page_id, frame_id);
            state.metas[frame_id.index()].bind(page_id);
            self.debug_validate(&state);
            (frame_id, page_id)
        };

        let data = self.frames[frame_id.index()].data.write();
        Ok(PinnedPageMut::new(self, frame_id, page_id, data))
    }

    /// Releases one pin on a page, optionally marking it dirty.
    ///
    /// The dirty bit is sticky: once any unpin marks a page dirty, later
    /// clean unpins do not clear it; only a write-back does. When the pin
    /// count reaches zero the frame becomes evictable.
    ///
    /// Guards already do this on drop — call this only for pins you
    /// manage by hand, and release each pin exactly once.
    ///
    /// Returns false (and changes nothing) if the page is not resident
    /// or its pin count is already zero.
    pub fn unpin_page(&self, page_id: PageId, mark_dirty: bool) -> bool {
        let mut state = self.state.lock();
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return false;
        };
        if state.metas[frame_id.index()].pin_count == 0 {
            return false;
        }

        state.metas[frame_id.index()].pin_count -= 1;
        state.metas[frame_id.index()].dirty |= mark_dirty;
        if state.metas[frame_id.index()].pin_count == 0 {
            state.replacer.touch(frame_id);
        }
        self.debug_validate(&state);
        true
    }

    /// Removes a page from the pool and the store.
    ///
    /// Returns `Ok(false)` — and leaves the store untouched — if the page
    /// is resident and pinned. Otherwise the frame (if any) returns to
    /// the free list and the page is deallocated from the store if it
    /// exists there.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool, PoolError> {
        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            if state.metas[frame_id.index()].is_pinned() {
                return Ok(false);
            }
            state.page_table.remove(&page_id);
            state.metas[frame_id.index()].clear();
            state.replacer.remove(frame_id);
            state.free_list.push(frame_id);
        }

        // still under the state lock, so the page cannot be re-fetched
        // between pool removal and store removal
        if self.store.contains_page(page_id) {
            self.store.deallocate_page(page_id)?;
        }
        self.debug_validate(&state);
        Ok(true)
    }

    /// Writes a page to the store if it is resident and dirty, clearing
    /// the dirty bit. Pin counts are unchanged.
    ///
    /// Returns `Ok(false)` iff the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool, PoolError> {
        let mut state = self.state.lock();
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return Ok(false);
        };

        if state.metas[frame_id.index()].dirty {
            {
                let data = self.frames[frame_id.index()].data.read();
                self.store.write_page(page_id, data.as_slice())?;
            }
            state.metas[frame_id.index()].dirty = false;
        }
        self.debug_validate(&state);
        Ok(true)
    }

    /// Writes every resident dirty page to the store, then syncs it.
    ///
    /// Iteration order is unspecified. Pin counts are unchanged.
    /// `flush_all` followed by dropping the pool is the clean-shutdown
    /// sequence.
    pub fn flush_all(&self) -> Result<(), PoolError> {
        let mut state = self.state.lock();

        for index in 0..state.metas.len() {
            let meta = &state.metas[index];
            let Some(page_id) = meta.page_id else {
                continue;
            };
            if !meta.dirty {
                continue;
            }

            {
                let data = self.frames[index].data.read();
                self.store.write_page(page_id, data.as_slice())?;
            }
            state.metas[index].dirty = false;
        }

        self.store.sync_all()?;
        self.debug_validate(&state);
        Ok(())
    }

    /// Pins `page_id` into a frame, loading it from the store on miss.
    fn pin_frame(&self, page_id: PageId) -> Result<FrameId, PoolError> {
        let mut state = self.state.lock();

        // hit: pin and shield from eviction
        if let Some(&frame_id) = state.page_table.get(&page_id) {
            state.metas[frame_id.index()].pin();
            if state.metas[frame_id.index()].pin_count == 1 {
                state.replacer.remove(frame_id);
            }
            self.debug_validate(&state);
            return Ok(frame_id);
        }

        // refuse before disturbing any frame if the store cannot serve
        // the page
        if !self.store.contains_page(page_id) {
            return Err(PoolError::PageNotFound(page_id));
        }

        let frame_id = self.take_frame(&mut state)?;

        {
            let mut data = self.frames[frame_id.index()].data.write();
            if let Err(e) = self.store.read_page(page_id, data.as_mut_slice()) {
                drop(data);
                state.free_list.push(frame_id);
                self.debug_validate(&state);
                return Err(e.into());
            }
        }

        state.page_table.insert(page_id, frame_id);
        state.metas[frame_id.index()].bind(page_id);
        self.debug_validate(&state);
        Ok(frame_id)
    }

    /// Produces an unoccupied frame: free list first, then eviction.
    ///
    /// An evicted dirty victim is written back before the frame is
    /// cleared. If that write fails, the victim is restored to the
    /// replacer still resident and dirty, and the error propagates.
    fn take_frame(&self, state: &mut PoolState<R>) -> Result<FrameId, PoolError> {
        if let Some(frame_id) = state.free_list.pop() {
            debug_assert!(!state.metas[frame_id.index()].is_occupied());
            return Ok(frame_id);
        }

        let Some(frame_id) = state.replacer.evict() else {
            return Err(PoolError::NoFreeFrames);
        };

        // the replacer must only ever yield unpinned resident frames;
        // fail the operation rather than corrupt the pool if it does not
        let meta = &state.metas[frame_id.index()];
        let (page_id, dirty) = match meta.page_id {
            Some(page_id) if meta.pin_count == 0 => (page_id, meta.dirty),
            _ => {
                debug_assert!(false, "replacer yielded an unevictable frame");
                return Err(PoolError::NoFreeFrames);
            }
        };

        if dirty {
            let result = {
                let data = self.frames[frame_id.index()].data.read();
                self.store.write_page(page_id, data.as_slice())
            };
            if let Err(e) = result {
                state.replacer.touch(frame_id);
                return Err(e.into());
            }
            state.metas[frame_id.index()].dirty = false;
        }

        state.page_table.remove(&page_id);
        state.metas[frame_id.index()].clear();
        Ok(frame_id)
    }

    /// Releases one pin from a dropping guard.
    ///
    /// A no-op when the pin count is already zero, which happens when the
    /// pin was released ahead of the guard through
    /// [`unpin_page`](Self::unpin_page).
    pub(super) fn unpin_frame(&self, frame_id: FrameId, dirty: bool) {
        let mut state = self.state.lock();

        if state.metas[frame_id.index()].pin_count == 0 {
            return;
        }
        state.metas[frame_id.index()].pin_count -= 1;
        state.metas[frame_id.index()].dirty |= dirty;
        if state.metas[frame_id.index()].pin_count == 0 {
            state.replacer.touch(frame_id);
        }
        self.debug_validate(&state);
    }

    /// Asserts the cross-component invariants in debug builds.
    fn debug_validate(&self, state: &PoolState<R>) {
        #[cfg(debug_assertions)]
        {
            let mut free = std::collections::HashSet::new();
            for &frame_id in &state.free_list {
                assert!(free.insert(frame_id), "duplicate free-list entry");
                let meta = &state.metas[frame_id.index()];
                assert!(
                    !meta.is_occupied() && !meta.is_pinned() && !meta.dirty,
                    "free-list frame is not vacant"
                );
            }

            let mut resident = 0usize;
            let mut pinned = 0usize;
            let mut evictable = 0usize;
            for (index, meta) in state.metas.iter().enumerate() {
                let frame_id = FrameId::new(index);
                match meta.page_id {
                    Some(page_id) => {
                        resident += 1;
                        assert!(!free.contains(&frame_id), "resident frame in free list");
                        assert_eq!(
                            state.page_table.get(&page_id),
                            Some(&frame_id),
                            "directory does not map a resident page to its frame"
                        );
                        if meta.is_pinned() {
                            pinned += 1;
                        } else {
                            evictable += 1;
                        }
                    }
                    None => {
                        assert!(!meta.is_pinned() && !meta.dirty, "vacant frame has state");
                        assert!(free.contains(&frame_id), "vacant frame not in free list");
                    }
                }
            }

            assert_eq!(state.page_table.len(), resident);
            assert_eq!(
                state.replacer.len(),
                evictable,
                "replacer size does not match evictable frame count"
            );
            assert_eq!(free.len() + pinned + evictable, self.config.pool_size);
        }
        #[cfg(not(debug_assertions))]
        let _ = state;
    }
}
