//! RAII pin guards for buffer pool pages.
//!
//! A guard is a pin: while it lives, the page stays resident and its
//! frame is neither evicted nor rebound. Dropping the guard releases the
//! pin; a mutable guard also reports whether it dirtied the page, which
//! feeds the frame's sticky dirty bit.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use super::frame::FrameId;
use super::pool::PagePool;
use super::replacer::Replacer;
use crate::page::{PageBuf, PageId};
use crate::store::Store;

/// Shared-access pin on a page.
///
/// Holds the frame's data latch in read mode; any number of readers may
/// pin the same page concurrently.
pub struct PinnedPage<'a, S: Store, R: Replacer> {
    pool: &'a PagePool<S, R>,
    frame_id: FrameId,
    page_id: PageId,
    // Option so Drop can release the latch before unpinning
    data: Option<RwLockReadGuard<'a, PageBuf>>,
}

impl<'a, S: Store, R: Replacer> PinnedPage<'a, S, R> {
    pub(super) fn new(
        pool: &'a PagePool<S, R>,
        frame_id: FrameId,
        page_id: PageId,
        data: RwLockReadGuard<'a, PageBuf>,
    ) -> Self {
        Self {
            pool,
            frame_id,
            page_id,
            data: Some(data),
        }
    }

    /// Returns the id of the pinned page.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns the page content.
    pub fn data(&self) -> &[u8] {
        self.data
            .as_ref()
            .expect("data latch released before drop")
            .as_slice()
    }
}

impl<S: Store, R: Replacer> Deref for PinnedPage<'_, S, R> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data()
    }
}

impl<S: Store, R: Replacer> Drop for PinnedPage<'_, S, R> {
    fn drop(&mut self) {
        // release the latch first: the unpin path takes the pool state
        // lock, and the pool takes state before latches everywhere else
        self.data.take();
        self.pool.unpin_frame(self.frame_id, false);
    }
}

/// Exclusive-access pin on a page.
///
/// Holds the frame's data latch in write mode. Mutable access (or an
/// explicit [`mark_dirty`](Self::mark_dirty)) flags the page so it is
/// written back before its frame is reused.
pub struct PinnedPageMut<'a, S: Store, R: Replacer> {
    pool: &'a PagePool<S, R>,
    frame_id: FrameId,
    page_id: PageId,
    data: Option<RwLockWriteGuard<'a, PageBuf>>,
    dirty: bool,
}

impl<'a, S: Store, R: Replacer> PinnedPageMut<'a, S, R> {
    pub(super) fn new(
        pool: &'a PagePool<S, R>,
        frame_id: FrameId,
        page_id: PageId,
        data: RwLockWriteGuard<'a, PageBuf>,
    ) -> Self {
        Self {
            pool,
            frame_id,
            page_id,
            data: Some(data),
            dirty: false,
        }
    }

    /// Returns the id of the pinned page.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns the page content.
    pub fn data(&self) -> &[u8] {
        self.data
            .as_ref()
            .expect("data latch released before drop")
            .as_slice()
    }

    /// Returns mutable page content and marks the page dirty.
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.dirty = true;
        self.data
            .as_mut()
            .expect("data latch released before drop")
            .as_mut_slice()
    }

    /// Marks the page dirty without touching the content.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

impl<S: Store, R: Replacer> Deref for PinnedPageMut<'_, S, R> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data()
    }
}

impl<S: Store, R: Replacer> DerefMut for PinnedPageMut<'_, S, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.data_mut()
    }
}

impl<S: Store, R: Replacer> Drop for PinnedPageMut<'_, S, R> {
    fn drop(&mut self) {
        self.data.take();
        self.pool.unpin_frame(self.frame_id, self.dirty);
    }
}
