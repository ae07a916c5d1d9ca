// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Minimum spacing between outbound provider calls.
//!
//! A single-token leaky bucket: one call may start per spacing window, shared by
//! every operation and every cycle. The returned permit holds the limiter's lock
//! for the duration of the call, so provider traffic is fully serialized.

use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::debug;

/// Process-wide call spacer.
#[derive(Debug)]
pub struct RateLimiter {
    spacing: Duration,
    last_call: Mutex<Option<Instant>>,
}

/// Exclusive right to perform one outbound call.
///
/// Dropping the permit lets the next caller proceed (after the spacing elapses).
#[derive(Debug)]
pub struct RatePermit<'a> {
    _guard: MutexGuard<'a, Option<Instant>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            last_call: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Wait until a call may start, then claim the slot.
    pub async fn acquire(&self) -> RatePermit<'_> {
        let mut last_call = self.last_call.lock().await;

        if let Some(last) = *last_call {
            let ready_at = last + self.spacing;
            let now = Instant::now();
            if ready_at > now {
                debug!(wait = ?(ready_at - now), "Spacing provider call");
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last_call = Some(Instant::now());
        RatePermit { _guard: last_call }
    }
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod rate_limit_tests;
