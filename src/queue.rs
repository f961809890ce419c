//! Thread-safe FIFO of pending sync operations.
//!
//! Producers are arbitrary local-mutation code paths (UI handlers, the
//! engine's own re-queue on failure); the single consumer is the drain loop.
//! The queue is unbounded: `push` never blocks and never fails. There is no
//! dedup here; redundant operations for the same record perform redundant
//! upserts, which is safe because upsert is idempotent.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::operation::SyncOperation;

#[derive(Default)]
pub struct SyncOperationQueue {
    inner: Mutex<VecDeque<SyncOperation>>,
}

impl SyncOperationQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation at the tail. Never blocks.
    pub fn push(&self, op: SyncOperation) {
        self.inner.lock().push_back(op);
    }

    /// Pop the operation at the head, if any.
    pub fn try_pop(&self) -> Option<SyncOperation> {
        self.inner.lock().pop_front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
