//! memlog - in-process memory monitoring agent.
//!
//! Attaches to a running process, samples memory usage on a cron-driven
//! schedule, counts garbage-collection notifications delivered by the host
//! runtime, and appends every sample to a JSON log file:
//!
//! ```text
//! async GC notification ──▶ GcEventCounter.increment (atomic, lock-free)
//!                                   │
//!                                   ▼ load
//! Schedule ──next_delay──▶ Sampler ──▶ MetricsSource (OS + runtime pools)
//!                                   │
//!                                   ▼
//!                           LogAppender ──▶ output file (JSON array)
//! ```
//!
//! The library is what an embedding layer links into the host process;
//! `memlogd` runs the same pipeline standalone against its own process.

pub mod agent;
pub mod appender;
pub mod config;
pub mod counter;
pub mod model;
mod sampler;
pub mod schedule;
pub mod source;

pub use agent::{Agent, AgentError};
pub use appender::{AppendError, LogAppender};
pub use config::{Config, ConfigError};
pub use counter::GcEventCounter;
pub use model::{Measurement, MemoryUsage, OsMemorySnapshot, RuntimeMemorySnapshot};
pub use schedule::{Schedule, ScheduleError};
pub use source::{MetricsSource, ProcessSource, SnapshotError};
