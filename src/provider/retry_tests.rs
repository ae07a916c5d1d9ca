// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `retry.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use std::sync::{Arc, Mutex};

    fn rate_limited() -> ProviderError {
        ProviderError::from_status("create", 429, "Too Many Requests".into())
    }

    /// Test that the provider schedule is 1s, 2s, 4s, 8s and then stops
    #[test]
    fn test_backoff_configuration() {
        let mut backoff = provider_backoff();
        assert_eq!(backoff.max_attempts(), 5);

        let delays: Vec<_> = std::iter::from_fn(|| backoff.next_backoff()).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8)
            ]
        );
        assert_eq!(backoff.next_backoff(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_success() {
        let result = retry_provider_call("list", "app.example.com", provider_backoff(), || async {
            Ok::<_, ProviderError>(42)
        })
        .await
        .unwrap();

        assert_eq!(result.value, 42);
        assert_eq!(result.attempts, 1);
        assert!(!result.was_retried());
    }

    /// Rate limited on attempts 1-4, success on attempt 5, with the exact delays between
    #[tokio::test(start_paused = true)]
    async fn test_success_on_fifth_attempt_observes_delays() {
        let attempts_at: Arc<Mutex<Vec<Instant>>> = Arc::default();
        let log = Arc::clone(&attempts_at);

        let result = retry_provider_call("create", "192.0.2.10", provider_backoff(), move || {
            let log = Arc::clone(&log);
            async move {
                let mut log = log.lock().unwrap();
                log.push(Instant::now());
                if log.len() < 5 {
                    Err(rate_limited())
                } else {
                    Ok("created")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result.value, "created");
        assert_eq!(result.attempts, 5);
        assert!(result.was_retried());

        let attempts_at = attempts_at.lock().unwrap();
        let gaps: Vec<_> = attempts_at.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(
            gaps,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_after_five_attempts() {
        let calls = Arc::new(Mutex::new(0u32));
        let counter = Arc::clone(&calls);
        let start = Instant::now();

        let err = retry_provider_call("delete", "id", provider_backoff(), move || {
            let counter = Arc::clone(&counter);
            async move {
                *counter.lock().unwrap() += 1;
                Err::<(), _>(ProviderError::from_status("delete", 503, String::new()))
            }
        })
        .await
        .unwrap_err();

        assert_eq!(*calls.lock().unwrap(), 5);
        assert_eq!(start.elapsed(), Duration::from_secs(15));
        match err {
            ProviderError::Exhausted { attempts, last, .. } => {
                assert_eq!(attempts, 5);
                assert!(matches!(*last, ProviderError::Server { status: 503, .. }));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    /// Non-retryable errors fail immediately with no delay
    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_fails_immediately() {
        let calls = Arc::new(Mutex::new(0u32));
        let counter = Arc::clone(&calls);
        let start = Instant::now();

        let err = retry_provider_call("create", "192.0.2.10", provider_backoff(), move || {
            let counter = Arc::clone(&counter);
            async move {
                *counter.lock().unwrap() += 1;
                Err::<(), _>(ProviderError::from_status("create", 403, "forbidden".into()))
            }
        })
        .await
        .unwrap_err();

        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(matches!(err, ProviderError::Api { status: 403, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_permanent_failure_stops() {
        let calls = Arc::new(Mutex::new(0u32));
        let counter = Arc::clone(&calls);

        let err = retry_provider_call("list", "app.example.com", provider_backoff(), move || {
            let counter = Arc::clone(&counter);
            async move {
                let mut n = counter.lock().unwrap();
                *n += 1;
                if *n == 1 {
                    Err::<(), _>(ProviderError::Timeout {
                        operation: "list",
                        timeout_ms: 10_000,
                    })
                } else {
                    Err(ProviderError::from_status("list", 401, "unauthorized".into()))
                }
            }
        })
        .await
        .unwrap_err();

        assert_eq!(*calls.lock().unwrap(), 2);
        assert!(matches!(err, ProviderError::Api { status: 401, .. }));
    }
}
