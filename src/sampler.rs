//! The sampling loop.
//!
//! One dedicated thread runs this state machine to completion:
//!
//! ```text
//! Idle ──start──▶ Sampling ──▶ Waiting ──▶ Sampling ──▶ … ──▶ Stopped
//!                    │            │
//!                    │            └─ full cron delay, slept in
//!                    │               delay / timeout_divider slices;
//!                    │               shutdown checked between slices
//!                    └─ read counter, query source, append record
//! ```
//!
//! Failures are contained per iteration: a snapshot or append failure is
//! logged and the loop carries on, preferring gaps in the log over taking
//! monitoring down. Only a schedule failure (no further wake-up can be
//! computed) stops the loop, so a persistently broken source cannot turn
//! into a tight failure storm.

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::agent::ShutdownFlag;
use crate::appender::{AppendError, LogAppender};
use crate::counter::GcEventCounter;
use crate::model::{Measurement, RuntimeMemorySnapshot};
use crate::schedule::Schedule;
use crate::source::{MetricsSource, SnapshotError};

/// A failure confined to a single sampling iteration.
#[derive(Debug)]
pub enum SampleError {
    /// The source could not produce a snapshot; the iteration is skipped.
    Snapshot(SnapshotError),
    /// The record could not be appended; the record is dropped.
    Append(AppendError),
}

impl std::fmt::Display for SampleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleError::Snapshot(e) => write!(f, "snapshot failed: {}", e),
            SampleError::Append(e) => write!(f, "append failed: {}", e),
        }
    }
}

impl std::error::Error for SampleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SampleError::Snapshot(e) => Some(e),
            SampleError::Append(e) => Some(e),
        }
    }
}

pub(crate) struct Sampler {
    source: Box<dyn MetricsSource + Send>,
    counter: GcEventCounter,
    schedule: Schedule,
    appender: LogAppender,
    timeout_divider: u32,
    shutdown: ShutdownFlag,
}

impl Sampler {
    pub(crate) fn new(
        source: Box<dyn MetricsSource + Send>,
        counter: GcEventCounter,
        schedule: Schedule,
        appender: LogAppender,
        timeout_divider: u32,
        shutdown: ShutdownFlag,
    ) -> Self {
        Self {
            source,
            counter,
            schedule,
            appender,
            timeout_divider,
            shutdown,
        }
    }

    /// Runs the loop to completion on the current thread, finalizing the
    /// output log on the way out.
    pub(crate) fn run(mut self) {
        info!(
            schedule = %self.schedule.expression(),
            "sampling loop started"
        );

        while self.shutdown.is_running() {
            if let Err(e) = self.sample_once() {
                warn!("measurement skipped: {}", e);
            }

            let delay = match self.schedule.next_delay() {
                Ok(delay) => delay,
                Err(e) => {
                    error!("cannot compute next wake-up, stopping: {}", e);
                    break;
                }
            };
            if !self.wait_until_due(delay) {
                break;
            }
        }

        match self.appender.close() {
            Ok(()) => info!("output log finalized"),
            Err(e) => error!("failed to finalize output log: {}", e),
        }
        info!("sampling loop stopped");
    }

    /// Builds one measurement and appends it.
    fn sample_once(&mut self) -> Result<(), SampleError> {
        let gc_events = self.counter.load();
        let os = self.source.os_snapshot().map_err(SampleError::Snapshot)?;
        let heap = self
            .source
            .runtime_snapshot(true)
            .map_err(SampleError::Snapshot)?;
        let non_heap = self
            .source
            .runtime_snapshot(false)
            .map_err(SampleError::Snapshot)?;

        let measurement = Measurement {
            current_time_millis: Utc::now().timestamp_millis() as u64,
            gc_events_count: gc_events,
            os,
            jvm: RuntimeMemorySnapshot::new(heap, non_heap),
        };

        self.appender
            .append(&measurement)
            .map_err(SampleError::Append)?;
        debug!(
            records = self.appender.records(),
            gc_events, "measurement appended"
        );
        Ok(())
    }

    /// Sleeps out the full delay in `timeout_divider` slices, re-checking
    /// the shutdown flag between slices. Early wake-ups only re-check
    /// shutdown — each due instant yields exactly one sample. Returns
    /// `false` once shutdown is observed.
    fn wait_until_due(&self, delay: Duration) -> bool {
        let deadline = Instant::now() + delay;
        let slice = (delay / self.timeout_divider).max(Duration::from_millis(1));

        loop {
            if !self.shutdown.is_running() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            if !self.shutdown.wait_timeout(slice.min(deadline - now)) {
                return false;
            }
        }
    }
}
