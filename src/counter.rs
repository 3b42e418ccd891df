//! Shared garbage-collection event counter.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cloneable handle to the process-wide garbage-collection event counter.
///
/// The notification side calls [`increment`](Self::increment) from whatever
/// context the host runtime delivers events on; the sampling loop calls
/// [`load`](Self::load). All clones share one cell. Relaxed ordering is
/// enough here: the count only needs eventual visibility and no lost
/// updates, not ordering relative to other memory.
#[derive(Clone, Debug, Default)]
pub struct GcEventCounter {
    events: Arc<AtomicU64>,
}

impl GcEventCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one garbage-collection event.
    ///
    /// Callable from any thread at any time, including native notification
    /// callbacks: never blocks, never allocates, never fails.
    #[inline]
    pub fn increment(&self) {
        self.events.fetch_add(1, Ordering::Relaxed);
    }

    /// Current cumulative event count.
    ///
    /// May lag in-flight increments, but never tears and never goes
    /// backwards.
    #[inline]
    pub fn load(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }
}
