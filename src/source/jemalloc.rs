//! Runtime pool usage from jemalloc statistics.
//!
//! Maps allocator statistics onto the heap/non-heap pool model: the heap
//! pool is application memory (`stats.active` committed, `stats.allocated`
//! used), the non-heap pool is allocator metadata. jemalloc has no notion
//! of initial or maximum pool sizes, so `init` and `max` carry the -1
//! "unknown" sentinel.
//!
//! Statistics are refreshed by writing the `epoch` mallctl before reading,
//! as jemalloc caches them between epochs.

use std::ffi::{CStr, c_void};
use std::ptr;

use crate::model::MemoryUsage;
use crate::source::SnapshotError;

/// Reads pool usage for the heap (`true`) or non-heap (`false`) category.
pub fn pool_usage(heap: bool) -> Result<MemoryUsage, SnapshotError> {
    advance_epoch()?;
    if heap {
        let active = read_usize(c"stats.active")?;
        let allocated = read_usize(c"stats.allocated")?;
        Ok(MemoryUsage {
            committed: active as i64,
            init: -1,
            max: -1,
            used: allocated as i64,
        })
    } else {
        let metadata = read_usize(c"stats.metadata")?;
        Ok(MemoryUsage {
            committed: metadata as i64,
            init: -1,
            max: -1,
            used: metadata as i64,
        })
    }
}

/// Advances the jemalloc statistics epoch so subsequent reads are fresh.
fn advance_epoch() -> Result<(), SnapshotError> {
    let mut epoch: u64 = 1;
    // SAFETY: "epoch" takes a u64 via newp/newlen; oldp is unused here.
    let code = unsafe {
        tikv_jemalloc_sys::mallctl(
            c"epoch".as_ptr(),
            ptr::null_mut(),
            ptr::null_mut(),
            (&mut epoch as *mut u64).cast::<c_void>(),
            size_of::<u64>(),
        )
    };
    if code != 0 {
        return Err(mallctl_error(c"epoch", code));
    }
    Ok(())
}

/// Reads one usize-valued statistic by mallctl name.
fn read_usize(name: &CStr) -> Result<usize, SnapshotError> {
    let mut value: usize = 0;
    let mut len = size_of::<usize>();
    // SAFETY: oldp/oldlenp describe a properly sized usize; the stats.*
    // mallctls we query are all usize-valued.
    let code = unsafe {
        tikv_jemalloc_sys::mallctl(
            name.as_ptr(),
            (&mut value as *mut usize).cast::<c_void>(),
            &mut len,
            ptr::null_mut(),
            0,
        )
    };
    if code != 0 {
        return Err(mallctl_error(name, code));
    }
    Ok(value)
}

fn mallctl_error(name: &CStr, code: i32) -> SnapshotError {
    SnapshotError::Unavailable(format!(
        "mallctl '{}' failed with code {}",
        name.to_string_lossy(),
        code
    ))
}
