//! Bounded Readiness Polling
//!
//! A generic "probe until ready" combinator: a fixed number of attempts with a
//! capped delay between them, stopping at the first ready observation. Probe
//! errors are not retried. The wait is abandoned as soon as the caller's
//! cancellation token fires.

use crate::config::ReadinessConfig;
use crate::error::{Error, Result};
use backoff::backoff::Backoff;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

// =============================================================================
// Retry Policy
// =============================================================================

/// Attempt budget and inter-attempt delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total probes, including the first
    pub max_attempts: u32,
    /// Delay between consecutive probes
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            max_delay,
        }
    }

    /// Longest time spent sleeping before giving up
    pub fn max_cumulative_delay(&self) -> Duration {
        self.max_delay * self.max_attempts.saturating_sub(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ReadinessConfig::default())
    }
}

impl From<&ReadinessConfig> for RetryPolicy {
    fn from(config: &ReadinessConfig) -> Self {
        Self::new(config.max_attempts, config.max_delay())
    }
}

/// Constant delay that runs out after `max_attempts - 1` waits
#[derive(Debug, Clone)]
struct BoundedBackoff {
    delay: Duration,
    waits: u32,
    remaining: u32,
}

impl BoundedBackoff {
    fn new(policy: &RetryPolicy) -> Self {
        let waits = policy.max_attempts.saturating_sub(1);
        Self {
            delay: policy.max_delay,
            waits,
            remaining: waits,
        }
    }
}

impl Backoff for BoundedBackoff {
    fn reset(&mut self) {
        self.remaining = self.waits;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.delay)
    }
}

// =============================================================================
// Polling
// =============================================================================

/// What a single probe observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    Ready(T),
    /// Not ready yet, with a description of the observed condition
    Pending(String),
}

/// Successful poll result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polled<T> {
    pub value: T,
    /// Probes issued, including the successful one
    pub attempts: u32,
}

/// Why the poll stopped without a ready observation
#[derive(Debug)]
pub enum PollError {
    /// Attempt budget exhausted; carries the last observed condition
    Exhausted { attempts: u32, last_condition: String },
    /// The probe itself failed
    Failed(Error),
    Cancelled,
}

enum Stop {
    NotReady(String),
    Failed(Error),
}

/// Run `probe` until it reports ready, the budget runs out, the probe fails,
/// or `cancel` fires.
pub async fn poll_until_ready<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation: &str,
    mut probe: F,
) -> std::result::Result<Polled<T>, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Probe<T>>>,
{
    let mut attempts = 0u32;

    let retry = backoff::future::retry(BoundedBackoff::new(policy), || {
        attempts += 1;
        let attempt = attempts;
        let observation = probe();
        async move {
            match observation.await {
                Ok(Probe::Ready(value)) => Ok(value),
                Ok(Probe::Pending(condition)) => {
                    debug!(operation, attempt, condition = %condition, "Not ready yet");
                    Err(backoff::Error::transient(Stop::NotReady(condition)))
                }
                Err(e) => Err(backoff::Error::permanent(Stop::Failed(e))),
            }
        }
    });

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!(operation, "Readiness poll cancelled");
            return Err(PollError::Cancelled);
        }
        outcome = retry => outcome,
    };

    match outcome {
        Ok(value) => Ok(Polled { value, attempts }),
        Err(Stop::NotReady(last_condition)) => {
            warn!(operation, attempts, last_condition = %last_condition, "Readiness attempts exhausted");
            Err(PollError::Exhausted {
                attempts,
                last_condition,
            })
        }
        Err(Stop::Failed(e)) => Err(PollError::Failed(e)),
    }
}
