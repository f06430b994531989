use std::sync::atomic::{AtomicU64, Ordering};

/// Issues call sequence numbers: 0, 1, 2, ... with no reuse.
///
/// Safe to share between threads; concurrent callers always receive
/// distinct values.
#[derive(Debug, Default)]
pub struct SequenceAllocator {
    next: AtomicU64,
}

impl SequenceAllocator {
    /// Create an allocator whose first value is 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next sequence number.
    pub fn next_sequence(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// The value the next allocation will return.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}
