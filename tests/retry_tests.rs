//! Retry wrapper integration tests

use aidispatch::utils::error::{helpers, AiError, AiResult};
use aidispatch::RetryConfig;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_deterministic_backoff_schedule() {
    let config = RetryConfig {
        max_retries: 3,
        retry_delay: 1.0,
        backoff_factor: 2.0,
        jitter: false,
    };
    let calls = AtomicU32::new(0);

    let start = Instant::now();
    let result: AiResult<()> = config
        .run("gpt-4o", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(helpers::provider_error(500, "boom")) }
        })
        .await;

    // Three sleeps: 1.0s, 2.0s, 4.0s; the 4th failure propagates without
    // a further attempt.
    assert!(matches!(result, Err(AiError::Provider { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(7), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(7100), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_retries_each_retryable_kind() {
    for error in [
        helpers::network_error("reset"),
        helpers::provider_error(503, "overloaded"),
        AiError::RateLimit("429".to_string()),
    ] {
        let config = RetryConfig {
            max_retries: 1,
            retry_delay: 0.01,
            backoff_factor: 1.0,
            jitter: false,
        };
        let calls = AtomicU32::new(0);
        let error_clone = error.clone();
        let result: AiResult<()> = config
            .run("gpt-4o", || {
                calls.fetch_add(1, Ordering::SeqCst);
                let error = error_clone.clone();
                async move { Err(error) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2, "for {:?}", error);
    }
}

#[tokio::test]
async fn test_never_retries_auth_or_invalid_request() {
    for error in [
        helpers::auth_error("bad key"),
        helpers::invalid_request_error("bad schema"),
        AiError::CircuitOpen("gpt-4o".to_string()),
        AiError::RateLimitExceeded("local".to_string()),
    ] {
        let config = RetryConfig {
            max_retries: 5,
            retry_delay: 0.01,
            backoff_factor: 1.0,
            jitter: false,
        };
        let calls = AtomicU32::new(0);
        let error_clone = error.clone();
        let result: AiResult<()> = config
            .run("gpt-4o", || {
                calls.fetch_add(1, Ordering::SeqCst);
                let error = error_clone.clone();
                async move { Err(error) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1, "for {:?}", error);
    }
}

#[tokio::test(start_paused = true)]
async fn test_last_error_surfaced_after_budget() {
    let config = RetryConfig {
        max_retries: 2,
        retry_delay: 0.5,
        backoff_factor: 2.0,
        jitter: false,
    };
    let calls = AtomicU32::new(0);
    let result: AiResult<()> = config
        .run("gpt-4o", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(helpers::network_error("early"))
                } else {
                    Err(helpers::provider_error(502, "final"))
                }
            }
        })
        .await;
    match result {
        Err(AiError::Provider { status, message }) => {
            assert_eq!(status, 502);
            assert_eq!(message, "final");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_jitter_never_exceeds_base_schedule() {
    let config = RetryConfig {
        max_retries: 3,
        retry_delay: 1.0,
        backoff_factor: 2.0,
        jitter: true,
    };
    let start = Instant::now();
    let _: AiResult<()> = config
        .run("gpt-4o", || async { Err(helpers::network_error("reset")) })
        .await;
    // Jitter scales each delay into [0, base]; totals stay within the
    // deterministic schedule.
    assert!(start.elapsed() <= Duration::from_secs(7));
}
