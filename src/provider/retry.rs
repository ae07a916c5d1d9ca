// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry logic with a fixed backoff schedule for DNS provider calls.
//!
//! This module retries transient provider errors (429, throttling codes, 5xx,
//! timeouts, connection failures) on a fixed schedule, while failing fast on
//! permanent errors (other 4xx, validation, undecodable responses).

use crate::constants::PROVIDER_RETRY_DELAYS;
use crate::errors::ProviderError;
use crate::metrics;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Fixed, finite backoff schedule.
///
/// Each call to [`FixedBackoff::next_backoff`] yields the next delay; once the
/// schedule is used up the caller must give up.
#[derive(Debug, Clone)]
pub struct FixedBackoff {
    delays: Vec<Duration>,
    next: usize,
}

impl FixedBackoff {
    #[must_use]
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays, next: 0 }
    }

    /// Get the next backoff interval, or `None` if the schedule is exhausted.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        let delay = self.delays.get(self.next).copied();
        if delay.is_some() {
            self.next += 1;
        }
        delay
    }

    /// Total attempts this schedule allows (initial call plus one per delay).
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        u32::try_from(self.delays.len()).unwrap_or(u32::MAX).saturating_add(1)
    }
}

/// Create the provider backoff schedule.
///
/// # Retry Schedule
///
/// 1. 1s
/// 2. 2s
/// 3. 4s
/// 4. 8s
///
/// Five attempts in total, roughly 15 seconds of waiting before giving up.
#[must_use]
pub fn provider_backoff() -> FixedBackoff {
    FixedBackoff::new(PROVIDER_RETRY_DELAYS.to_vec())
}

/// A successful result together with how many attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    pub value: T,
    /// 1 when the first attempt succeeded
    pub attempts: u32,
}

impl<T> Retried<T> {
    /// Whether at least one retry was needed.
    #[must_use]
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }
}

/// Retry a provider call on the given schedule.
///
/// # Arguments
///
/// * `operation` - Provider operation name for logs (`list`, `create`, `delete`)
/// * `target` - What the call acts on (record name, IP or record id)
/// * `backoff` - Delay schedule between attempts
/// * `call` - Performs one attempt
///
/// # Errors
///
/// Returns the error unchanged if it is not retryable, or
/// `ProviderError::Exhausted` wrapping the last failure once the schedule is used up.
pub async fn retry_provider_call<T, F, Fut>(
    operation: &'static str,
    target: &str,
    mut backoff: FixedBackoff,
    mut call: F,
) -> Result<Retried<T>, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let start_time = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        match call().await {
            Ok(value) => {
                if attempt > 1 {
                    warn!(
                        operation = operation,
                        target = target,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        "Provider call succeeded after retries"
                    );
                } else {
                    debug!(operation = operation, target = target, "Provider call succeeded");
                }
                return Ok(Retried {
                    value,
                    attempts: attempt,
                });
            }
            Err(e) => {
                if !e.is_retryable() {
                    error!(
                        operation = operation,
                        target = target,
                        attempt = attempt,
                        error = %e,
                        "Non-retryable provider error, failing immediately"
                    );
                    return Err(e);
                }

                if let Some(duration) = backoff.next_backoff() {
                    warn!(
                        operation = operation,
                        target = target,
                        attempt = attempt,
                        retry_after = ?duration,
                        error = %e,
                        "Retryable provider error, will retry"
                    );
                    metrics::record_provider_retry(operation);
                    tokio::time::sleep(duration).await;
                } else {
                    error!(
                        operation = operation,
                        target = target,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        error = %e,
                        "Backoff exhausted, giving up"
                    );
                    return Err(ProviderError::Exhausted {
                        operation,
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
