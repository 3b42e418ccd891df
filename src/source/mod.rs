//! Memory snapshot sources.
//!
//! The sampling loop is source-agnostic: anything implementing
//! [`MetricsSource`] can feed it. Two implementations ship with the crate:
//!
//! - [`procfs`] — OS-level statistics parsed from the `/proc` filesystem
//! - [`jemalloc`] — runtime pool usage from allocator statistics
//!
//! [`ProcessSource`] composes both to monitor the calling process itself,
//! which is what the `memlogd` binary runs.

pub mod jemalloc;
pub mod procfs;

use std::io;

use crate::model::{MemoryUsage, OsMemorySnapshot};

pub use procfs::{ProcFs, ProcReader, RealProc};

/// Error type for snapshot failures.
#[derive(Debug)]
pub enum SnapshotError {
    /// The source cannot produce a snapshot right now.
    Unavailable(String),
    /// I/O error reading source data.
    Io(io::Error),
    /// Malformed source data.
    Parse(String),
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::Unavailable(what) => write!(f, "snapshot unavailable: {}", what),
            SnapshotError::Io(e) => write!(f, "I/O error: {}", e),
            SnapshotError::Parse(msg) => write!(f, "parse error: {}", msg),
        }
    }
}

impl std::error::Error for SnapshotError {}

impl From<io::Error> for SnapshotError {
    fn from(e: io::Error) -> Self {
        SnapshotError::Io(e)
    }
}

/// Supplies the two snapshots that make up one measurement.
///
/// Both calls may block transiently on the underlying facility and may
/// fail; a failed call abandons the current sampling iteration and the
/// loop carries on at the next tick.
pub trait MetricsSource {
    /// OS-level memory statistics.
    fn os_snapshot(&mut self) -> Result<OsMemorySnapshot, SnapshotError>;

    /// Runtime-level memory usage for the heap (`true`) or non-heap
    /// (`false`) pool category.
    fn runtime_snapshot(&mut self, heap: bool) -> Result<MemoryUsage, SnapshotError>;
}

impl<S: MetricsSource + ?Sized> MetricsSource for Box<S> {
    fn os_snapshot(&mut self) -> Result<OsMemorySnapshot, SnapshotError> {
        (**self).os_snapshot()
    }

    fn runtime_snapshot(&mut self, heap: bool) -> Result<MemoryUsage, SnapshotError> {
        (**self).runtime_snapshot(heap)
    }
}

/// Self-monitoring source: OS statistics for the host from `/proc`,
/// runtime pools from the process's own allocator.
#[derive(Debug, Default)]
pub struct ProcessSource {
    proc_reader: ProcReader<RealProc>,
}

impl ProcessSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsSource for ProcessSource {
    fn os_snapshot(&mut self) -> Result<OsMemorySnapshot, SnapshotError> {
        self.proc_reader.os_snapshot()
    }

    fn runtime_snapshot(&mut self, heap: bool) -> Result<MemoryUsage, SnapshotError> {
        jemalloc::pool_usage(heap)
    }
}
