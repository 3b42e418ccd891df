//! Agent lifecycle: owns the sampling thread.

use std::io;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{error, info};

use crate::appender::{AppendError, LogAppender};
use crate::config::Config;
use crate::counter::GcEventCounter;
use crate::sampler::Sampler;
use crate::schedule::{Schedule, ScheduleError};
use crate::source::MetricsSource;

/// Startup failure. Any of these prevents the agent from running at all.
#[derive(Debug)]
pub enum AgentError {
    Schedule(ScheduleError),
    Log(AppendError),
    Spawn(io::Error),
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentError::Schedule(e) => write!(f, "{}", e),
            AgentError::Log(e) => write!(f, "{}", e),
            AgentError::Spawn(e) => write!(f, "cannot spawn sampling thread: {}", e),
        }
    }
}

impl std::error::Error for AgentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AgentError::Schedule(e) => Some(e),
            AgentError::Log(e) => Some(e),
            AgentError::Spawn(e) => Some(e),
        }
    }
}

impl From<ScheduleError> for AgentError {
    fn from(e: ScheduleError) -> Self {
        AgentError::Schedule(e)
    }
}

impl From<AppendError> for AgentError {
    fn from(e: AppendError) -> Self {
        AgentError::Log(e)
    }
}

/// Cooperative shutdown signal shared between the agent and its loop.
///
/// A flag behind a condvar rather than a bare atomic, so a loop sleeping
/// out a schedule slice is woken the moment shutdown is requested instead
/// of finishing the slice first.
#[derive(Clone)]
pub(crate) struct ShutdownFlag {
    inner: Arc<ShutdownInner>,
}

struct ShutdownInner {
    running: Mutex<bool>,
    wake: Condvar,
}

impl ShutdownFlag {
    fn new() -> Self {
        Self {
            inner: Arc::new(ShutdownInner {
                running: Mutex::new(true),
                wake: Condvar::new(),
            }),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        *self.inner.running.lock().unwrap()
    }

    /// Sleeps up to `timeout` or until shutdown is requested, whichever
    /// comes first. Returns whether the agent is still running.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.inner.running.lock().unwrap();
        if !*guard {
            return false;
        }
        let (guard, _) = self.inner.wake.wait_timeout(guard, timeout).unwrap();
        *guard
    }

    fn request_stop(&self) {
        let mut guard = self.inner.running.lock().unwrap();
        *guard = false;
        self.inner.wake.notify_all();
    }
}

/// The monitoring agent.
///
/// Construction validates the schedule expression and opens the output log
/// — both are fatal on failure, and a bad expression fails before the
/// output file is created. [`start`](Self::start) then hands the loop to a
/// dedicated thread; [`stop`](Self::stop) signals shutdown and waits for
/// the loop to finish its current iteration and finalize the log.
///
/// The [`GcEventCounter`] handle from [`counter`](Self::counter) is what
/// the embedding layer registers with the host runtime's notification
/// mechanism; the agent itself never increments it.
pub struct Agent {
    counter: GcEventCounter,
    shutdown: ShutdownFlag,
    sampler: Option<Sampler>,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("counter", &self.counter)
            .field("running", &self.sampler.is_some())
            .field("started", &self.handle.is_some())
            .finish()
    }
}

impl Agent {
    /// Builds an idle agent from a validated configuration and a snapshot
    /// source. No thread is spawned yet.
    pub fn new<S>(config: &Config, source: S) -> Result<Self, AgentError>
    where
        S: MetricsSource + Send + 'static,
    {
        let schedule = Schedule::new(&config.cron_expression)?;
        let appender = LogAppender::open(&config.output_path)?;
        let counter = GcEventCounter::new();
        let shutdown = ShutdownFlag::new();

        let sampler = Sampler::new(
            Box::new(source),
            counter.clone(),
            schedule,
            appender,
            config.timeout_divider.max(1),
            shutdown.clone(),
        );

        Ok(Self {
            counter,
            shutdown,
            sampler: Some(sampler),
            handle: None,
        })
    }

    /// Handle for the host runtime's event notification callback.
    pub fn counter(&self) -> GcEventCounter {
        self.counter.clone()
    }

    /// Starts the sampling loop on a dedicated thread and returns
    /// immediately. Calling it again after a successful start is a no-op.
    pub fn start(&mut self) -> Result<(), AgentError> {
        let Some(sampler) = self.sampler.take() else {
            return Ok(());
        };
        let handle = thread::Builder::new()
            .name("memlog-sampler".to_string())
            .spawn(move || sampler.run())
            .map_err(AgentError::Spawn)?;
        self.handle = Some(handle);
        info!("agent started");
        Ok(())
    }

    /// Requests shutdown and blocks until the loop has stopped and the
    /// output log is finalized. Idempotent: further calls are no-ops.
    pub fn stop(&mut self) {
        self.shutdown.request_stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("sampling thread panicked");
            }
            info!("agent stopped");
        }
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        self.stop();
    }
}
