//! Buffer pool errors.

use crate::page::PageId;
use crate::store::StoreError;

/// Errors that can occur during buffer pool operations.
#[derive(Debug)]
pub enum PoolError {
    /// Invalid construction arguments (zero pool size, zero page size, or
    /// a page size that differs from the store's).
    BadConfig(String),

    /// Every frame holds a pinned page; nothing can be evicted.
    NoFreeFrames,

    /// The requested page does not exist in the store.
    PageNotFound(PageId),

    /// Failure reported by the backing store.
    Store(StoreError),
}

impl std::fmt::Display for PoolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolError::BadConfig(msg) => write!(f, "bad pool configuration: {}", msg),
            PoolError::NoFreeFrames => {
                write!(f, "no free frames available and all pages are pinned")
            }
            PoolError::PageNotFound(page_id) => write!(f, "page not found: {:?}", page_id),
            PoolError::Store(e) => write!(f, "store error: {}", e),
        }
    }
}

impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PoolError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for PoolError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(page_id) => PoolError::PageNotFound(page_id),
            other => PoolError::Store(other),
        }
    }
}
