//! Store errors.

use crate::page::PageId;

/// Errors reported by a [`Store`](super::Store).
#[derive(Debug)]
pub enum StoreError {
    /// The page was never allocated or has been deallocated.
    NotFound(PageId),

    /// A buffer passed to `read_page`/`write_page` was not exactly one
    /// page long.
    BadSize {
        /// The store's configured page size.
        expected: usize,
        /// Length of the buffer that was provided.
        actual: usize,
    },

    /// I/O error from the underlying file system.
    Io(std::io::Error),

    /// The backing file does not have a valid layout.
    Corrupted(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(page_id) => write!(f, "page not found: {:?}", page_id),
            StoreError::BadSize { expected, actual } => {
                write!(f, "bad buffer size: expected {}, got {}", expected, actual)
            }
            StoreError::Io(e) => write!(f, "I/O error: {}", e),
            StoreError::Corrupted(msg) => write!(f, "store corrupted: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}
