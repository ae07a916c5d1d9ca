// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `rate_limit.rs`

use super::*;
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn test_first_call_is_immediate() {
    let limiter = RateLimiter::new(Duration::from_secs(1));
    let start = Instant::now();
    drop(limiter.acquire().await);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_consecutive_calls_are_spaced() {
    let limiter = RateLimiter::new(Duration::from_millis(1000));
    let start = Instant::now();

    drop(limiter.acquire().await);
    drop(limiter.acquire().await);
    assert_eq!(start.elapsed(), Duration::from_millis(1000));

    drop(limiter.acquire().await);
    assert_eq!(start.elapsed(), Duration::from_millis(2000));
}

#[tokio::test(start_paused = true)]
async fn test_no_wait_after_idle_period() {
    let limiter = RateLimiter::new(Duration::from_millis(1000));
    drop(limiter.acquire().await);

    tokio::time::sleep(Duration::from_secs(5)).await;
    let before = Instant::now();
    drop(limiter.acquire().await);
    assert_eq!(before.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_are_serialized() {
    let limiter = Arc::new(RateLimiter::new(Duration::from_millis(1000)));
    let start = Instant::now();

    let tasks: Vec<_> = (0..3)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move {
                let _permit = limiter.acquire().await;
                start.elapsed()
            })
        })
        .collect();

    let mut starts = Vec::new();
    for task in tasks {
        starts.push(task.await.unwrap());
    }
    starts.sort();
    assert_eq!(
        starts,
        vec![
            Duration::ZERO,
            Duration::from_millis(1000),
            Duration::from_millis(2000)
        ]
    );
}
