use arc_swap::ArcSwap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::snapshot::Snapshot;

/// Holder of the currently served [`Snapshot`].
///
/// Readers take an `Arc` to whichever snapshot is published at that instant
/// and keep using it for the whole request; publishing swaps the pointer in a
/// single store, so a reader sees the old snapshot or the new one, never a mix.
pub struct SnapshotCache {
    current: ArcSwap<Snapshot>,
    ready: AtomicBool
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::empty()),
            ready: AtomicBool::new(false)
        }
    }

    pub fn current(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Replaces the served snapshot and returns the previous one.
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let previous = self.current.swap(Arc::new(snapshot));
        self.ready.store(true, Ordering::Release);
        previous
    }

    /// True once at least one snapshot has been published.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn loaded_count(&self) -> usize {
        self.current.load().len()
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}
