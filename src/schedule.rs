//! Cron-driven wake-up schedule.

use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;

/// Error raised when a schedule expression cannot be used.
#[derive(Debug)]
pub enum ScheduleError {
    /// The expression does not parse as a cron schedule.
    InvalidExpression { expr: String, reason: String },
    /// The expression parses but matches no future instant.
    NoUpcomingInstant { expr: String },
}

impl std::fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleError::InvalidExpression { expr, reason } => {
                write!(f, "invalid schedule expression '{}': {}", expr, reason)
            }
            ScheduleError::NoUpcomingInstant { expr } => {
                write!(f, "schedule expression '{}' has no upcoming instant", expr)
            }
        }
    }
}

impl std::error::Error for ScheduleError {}

/// A validated cron schedule.
///
/// Expressions use the seconds-first field syntax
/// (`sec min hour day month weekday`), supporting `*`, ranges, steps and
/// lists; `*/1 * * * * *` fires every second. Parsing happens once at
/// construction, so a malformed expression is rejected before any other
/// resource is touched.
pub struct Schedule {
    expr: String,
    inner: cron::Schedule,
}

impl Schedule {
    pub fn new(expr: &str) -> Result<Self, ScheduleError> {
        let inner =
            cron::Schedule::from_str(expr).map_err(|e| ScheduleError::InvalidExpression {
                expr: expr.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            expr: expr.to_string(),
            inner,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expr
    }

    /// Delay from now until the next instant matching the expression.
    ///
    /// Re-evaluated against the current wall clock on every call — no
    /// assumption that earlier sleeps were exact. Boundaries at or before
    /// the current instant are skipped, so the returned delay is always
    /// strictly positive. Rounded up to the next whole millisecond: a
    /// sleeper waking on this delay lands past the boundary, never a
    /// fraction of a millisecond short of it.
    pub fn next_delay(&self) -> Result<Duration, ScheduleError> {
        let now = Utc::now();
        let next = self
            .inner
            .after(&now)
            .next()
            .ok_or_else(|| ScheduleError::NoUpcomingInstant {
                expr: self.expr.clone(),
            })?;
        let millis = (next - now).num_milliseconds().max(0) as u64 + 1;
        Ok(Duration::from_millis(millis))
    }
}

impl std::fmt::Debug for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schedule").field("expr", &self.expr).finish()
    }
}
