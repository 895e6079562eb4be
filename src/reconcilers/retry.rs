// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bounded retry of optimistic-concurrency conflicts.
//!
//! Status persistence is the only place in the operator that retries a cluster
//! call by itself. Every other failure propagates and the controller re-runs
//! the whole pass later. [`retry_on_conflict`] re-runs a read-modify-write
//! closure while it fails with a conflict, sleeping with exponential backoff
//! between attempts, and gives up after a fixed number of attempts.

use crate::constants::{
    DEFAULT_CONFLICT_RETRY_ATTEMPTS, DEFAULT_CONFLICT_RETRY_INITIAL_MILLIS,
    DEFAULT_CONFLICT_RETRY_MAX_MILLIS,
};
use crate::errors::ReconcileError;
use crate::metrics::record_status_conflict;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Backoff multiplier (exponential growth factor)
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Randomization factor to prevent thundering herd (±10%)
const RANDOMIZATION_FACTOR: f64 = 0.1;

/// Simple exponential backoff implementation.
///
/// Provides exponential backoff with randomization (jitter) to prevent thundering herd.
pub struct ExponentialBackoff {
    /// Current interval duration
    pub current_interval: Duration,
    /// Interval of the first retry
    pub initial_interval: Duration,
    /// Maximum interval duration
    pub max_interval: Duration,
    /// Maximum total elapsed time
    pub max_elapsed_time: Option<Duration>,
    /// Backoff multiplier (typically 2.0 for doubling)
    pub multiplier: f64,
    /// Randomization factor (e.g., 0.1 for ±10%)
    pub randomization_factor: f64,
    start_time: Instant,
}

impl ExponentialBackoff {
    #[must_use]
    pub fn new(
        initial_interval: Duration,
        max_interval: Duration,
        max_elapsed_time: Option<Duration>,
        multiplier: f64,
        randomization_factor: f64,
    ) -> Self {
        Self {
            current_interval: initial_interval,
            initial_interval,
            max_interval,
            max_elapsed_time,
            multiplier,
            randomization_factor,
            start_time: Instant::now(),
        }
    }

    /// Get the next backoff interval, or None if max elapsed time exceeded.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if let Some(max_elapsed) = self.max_elapsed_time {
            if self.start_time.elapsed() >= max_elapsed {
                return None;
            }
        }

        let interval = self.current_interval;
        let jittered = self.apply_jitter(interval);

        let next = interval.as_secs_f64() * self.multiplier;
        self.current_interval = Duration::from_secs_f64(next).min(self.max_interval);

        Some(jittered)
    }

    fn apply_jitter(&self, interval: Duration) -> Duration {
        if self.randomization_factor == 0.0 || interval.is_zero() {
            return interval;
        }

        let secs = interval.as_secs_f64();
        let delta = secs * self.randomization_factor;
        let jittered = rand::random_range((secs - delta)..=(secs + delta));

        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// How often and how fast a conflicting write is retried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConflictRetry {
    /// Total attempts, including the first one
    pub attempts: u32,
    /// Sleep before the second attempt
    pub initial_interval: Duration,
    /// Upper bound for any single sleep
    pub max_interval: Duration,
}

impl Default for ConflictRetry {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_CONFLICT_RETRY_ATTEMPTS,
            initial_interval: Duration::from_millis(DEFAULT_CONFLICT_RETRY_INITIAL_MILLIS),
            max_interval: Duration::from_millis(DEFAULT_CONFLICT_RETRY_MAX_MILLIS),
        }
    }
}

impl ConflictRetry {
    /// Backoff schedule for one retried write. The attempt budget, not elapsed
    /// time, bounds the loop.
    #[must_use]
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(
            self.initial_interval,
            self.max_interval,
            None,
            BACKOFF_MULTIPLIER,
            RANDOMIZATION_FACTOR,
        )
    }
}

/// Run `operation` until it succeeds, fails with something other than a
/// conflict, or has been attempted `policy.attempts` times.
///
/// `operation` must redo the whole read-modify-write; retrying only the write
/// would resend the stale resourceVersion.
///
/// # Errors
///
/// Returns the first non-conflict error unchanged, or
/// [`ReconcileError::ConflictRetriesExhausted`] once the budget is spent.
pub async fn retry_on_conflict<T, F, Fut>(
    policy: &ConflictRetry,
    resource: &str,
    mut operation: F,
) -> Result<T, ReconcileError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ReconcileError>>,
{
    let budget = policy.attempts.max(1);
    let mut backoff = policy.backoff();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(resource, attempt, "Write succeeded after conflicts");
                }
                return Ok(value);
            }
            Err(e) if e.is_conflict() => {
                record_status_conflict(resource);
                if attempt >= budget {
                    error!(resource, attempt, "Conflict retry budget exhausted");
                    return Err(ReconcileError::ConflictRetriesExhausted {
                        resource: resource.to_string(),
                        attempts: attempt,
                    });
                }
                let delay = backoff.next_backoff().unwrap_or(policy.max_interval);
                warn!(resource, attempt, retry_after = ?delay, "Write conflicted, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
