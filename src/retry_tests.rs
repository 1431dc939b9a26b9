// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `retry.rs`

#[cfg(test)]
mod tests {
    use crate::errors::ProviderError;
    use crate::retry::{retry_provider_call, RetryPolicy};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn http(status: u16) -> ProviderError {
        ProviderError::Http {
            status,
            url: "https://compute.googleapis.com/compute/v1/projects/p/zones".into(),
            message: "boom".into(),
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.initial_interval, Duration::from_millis(50));
        assert_eq!(policy.max_interval, Duration::from_secs(10));
        assert_eq!(policy.max_elapsed_time, Duration::from_secs(120));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let mut backoff = RetryPolicy {
            initial_interval: Duration::from_secs(4),
            max_interval: Duration::from_secs(10),
            max_elapsed_time: Duration::from_secs(600),
        }
        .backoff();

        let first = backoff.next_backoff().unwrap();
        assert!(first >= Duration::from_millis(3600) && first <= Duration::from_millis(4400));
        let second = backoff.next_backoff().unwrap();
        assert!(second >= Duration::from_millis(7200) && second <= Duration::from_millis(8800));
        // 16s is capped at 10s, plus jitter
        let third = backoff.next_backoff().unwrap();
        assert!(third <= Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried() {
        let attempts = AtomicU32::new(0);
        let result = retry_provider_call(
            RetryPolicy::default(),
            || async {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(http(503))
                } else {
                    Ok("zones")
                }
            },
            "list zones",
        )
        .await;

        assert_eq!(result.unwrap(), "zones");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_errors_fail_immediately() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = retry_provider_call(
            RetryPolicy::default(),
            || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(http(403))
            },
            "list zones",
        )
        .await;

        assert_eq!(result.unwrap_err().status(), Some(403));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_retry_policy_gives_up_at_once() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = retry_provider_call(
            RetryPolicy::none(),
            || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(http(429))
            },
            "set labels",
        )
        .await;

        assert_eq!(result.unwrap_err().status(), Some(429));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
