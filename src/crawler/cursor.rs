//! Shared page cursor
//!
//! Every crawl worker pulls its next page index from one cursor, so no two
//! workers ever visit the same page and no index is skipped.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic page index handed out to workers
#[derive(Debug)]
pub struct PageCursor {
    next: AtomicU64,
}

impl PageCursor {
    /// Creates a cursor whose first `next()` returns `start`
    pub fn new(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }

    /// Claims the next page index
    ///
    /// Returns the pre-increment value. Concurrent callers always receive
    /// distinct values and together cover a contiguous range.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// Value the next call to `next()` would return
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new(0)
    }
}
