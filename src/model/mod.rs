//! The measurement record written to the output log.
//!
//! One `Measurement` is produced per sampling tick and serialized as a JSON
//! object; the log file as a whole is a single top-level JSON array of them.
//! Field names on the wire are camelCase and fixed — downstream readers key
//! on them.

use serde::{Deserialize, Serialize};

/// Memory usage for one runtime pool category, as reported by the source.
///
/// `init` and `max` may be -1 when the runtime does not know them. The
/// values are passed through untouched; normalizing the sentinels away
/// would hide information from the log's consumers.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct MemoryUsage {
    /// Bytes currently committed for the pool.
    pub committed: i64,
    /// Bytes requested at initialization, or -1 if unknown.
    pub init: i64,
    /// Upper bound for the pool, or -1 if unbounded/unknown.
    pub max: i64,
    /// Bytes currently in use.
    pub used: i64,
}

/// Runtime-level memory snapshot: the heap and non-heap pools plus their
/// combined committed size.
///
/// Serialized under the `jvm` key of a [`Measurement`].
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeMemorySnapshot {
    /// `heap.committed + non_heap.committed`. Always recomputed here,
    /// never accepted from the source, so it cannot drift from the pools.
    pub overall: i64,
    pub heap: MemoryUsage,
    pub non_heap: MemoryUsage,
}

impl RuntimeMemorySnapshot {
    /// Combines the two pool snapshots, deriving `overall`.
    pub fn new(heap: MemoryUsage, non_heap: MemoryUsage) -> Self {
        Self {
            overall: heap.committed + non_heap.committed,
            heap,
            non_heap,
        }
    }
}

/// OS-level memory snapshot, in bytes.
///
/// Source: `/proc/meminfo` (system totals) and `/proc/self/status` (VmRSS)
/// in the shipped collector; other sources may fill these from their own
/// platform facilities.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct OsMemorySnapshot {
    /// Total usable RAM.
    pub memory_total: i64,
    /// Free RAM.
    pub memory_free: i64,
    /// Estimate of RAM available for new workloads without swapping.
    pub memory_available: i64,
    /// Total swap space.
    pub swap_total: i64,
    /// Free swap space.
    pub swap_free: i64,
    /// Resident set size of the monitored process.
    pub process_rss: i64,
}

/// One sample: wall-clock stamp, cumulative GC event count, and the two
/// memory snapshots. Built fresh each tick, handed to the log appender,
/// then discarded.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    /// Epoch milliseconds at the time the sample was built.
    pub current_time_millis: u64,
    /// Cumulative garbage-collection events observed so far. Never resets,
    /// so the value is non-decreasing across consecutive records.
    pub gc_events_count: u64,
    pub os: OsMemorySnapshot,
    pub jvm: RuntimeMemorySnapshot,
}
