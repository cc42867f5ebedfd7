//! Bounded polling shared by every readiness and availability check.

use crate::errors::{BrowserError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Default readiness timeout.
pub const DEFAULT_READY_TIMEOUT_MS: u64 = 60_000;

/// Default interval between readiness checks.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// How the timeout is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollBudget {
    /// Stop once wall time since the first check reaches the timeout.
    #[default]
    Elapsed,
    /// Subtract one interval per cycle; stop when less than 1 ms remains.
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub timeout: Duration,
    pub interval: Duration,
    pub budget: PollBudget,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_READY_TIMEOUT_MS),
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            budget: PollBudget::Elapsed,
        }
    }
}

impl PollOptions {
    pub fn new(timeout_ms: u64, interval_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
            interval: Duration::from_millis(interval_ms),
            budget: PollBudget::Elapsed,
        }
    }

    pub fn decrementing(budget_ms: u64, interval_ms: u64) -> Self {
        Self {
            budget: PollBudget::Decrement,
            ..Self::new(budget_ms, interval_ms)
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

/// Result of a poll that did not hit a fatal error.
#[derive(Debug)]
pub enum Polled<T> {
    Ready {
        value: T,
        attempts: u32,
        elapsed: Duration,
    },
    Exhausted {
        attempts: u32,
        elapsed: Duration,
        last_error: Option<BrowserError>,
    },
}

impl<T> Polled<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Polled::Ready { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Polled::Ready { attempts, .. } | Polled::Exhausted { attempts, .. } => *attempts,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            Polled::Ready { elapsed, .. } | Polled::Exhausted { elapsed, .. } => *elapsed,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Polled::Ready { value, .. } => Some(value),
            Polled::Exhausted { .. } => None,
        }
    }
}

/// Run `check` repeatedly until it yields a value or the budget runs out.
///
/// `Ok(None)` and transient errors both mean "not yet"; errors are logged
/// and remembered. Configuration errors and malformed selectors abort the
/// poll immediately, as does a zero interval.
pub async fn poll_until<T, F, Fut>(options: &PollOptions, mut check: F) -> Result<Polled<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    if options.interval.is_zero() {
        return Err(BrowserError::ConfigurationError(
            "poll interval must be greater than zero".to_string(),
        ));
    }

    let started = Instant::now();
    let mut remaining = options.timeout;
    let mut attempts = 0u32;
    let mut last_error = None;

    loop {
        if options.budget == PollBudget::Elapsed && started.elapsed() >= options.timeout {
            break;
        }

        attempts += 1;
        match check().await {
            Ok(Some(value)) => {
                return Ok(Polled::Ready {
                    value,
                    attempts,
                    elapsed: started.elapsed(),
                });
            }
            Ok(None) => {}
            Err(err) if err.is_permanent() => return Err(err),
            Err(err) => {
                debug!("poll attempt {} failed: {}", attempts, err);
                last_error = Some(err);
            }
        }

        tokio::time::sleep(options.interval).await;

        if options.budget == PollBudget::Decrement {
            remaining = remaining.saturating_sub(options.interval);
            if remaining < Duration::from_millis(1) {
                break;
            }
        }
    }

    Ok(Polled::Exhausted {
        attempts,
        elapsed: started.elapsed(),
        last_error,
    })
}
