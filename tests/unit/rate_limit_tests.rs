// ==============================
// tests/unit/rate_limit_tests.rs
// ==============================
//! This test suite validates the per-client `RateLimiter`
use gatekeeper_lib::error::AuthError;
use gatekeeper_lib::rate_limit::RateLimiter;
use std::sync::Arc;
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(3600);

#[tokio::test(start_paused = true)]
async fn test_one_token_every_thirty_seconds() {
    let limiter = RateLimiter::every(Duration::from_secs(30), 2, HOUR);

    assert!(limiter.check("203.0.113.5").is_ok());
    assert!(limiter.check("203.0.113.5").is_ok());
    assert!(matches!(
        limiter.check("203.0.113.5"),
        Err(AuthError::RateLimitExceeded)
    ));

    // Another client is unaffected
    assert!(limiter.check("203.0.113.6").is_ok());

    tokio::time::advance(Duration::from_secs(31)).await;
    assert!(limiter.check("203.0.113.5").is_ok());
    assert!(limiter.check("203.0.113.5").is_err());
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_bucket_refills_to_burst_only() {
    let limiter = RateLimiter::new(1.0, 3, HOUR);

    for _ in 0..3 {
        assert!(limiter.check("client").is_ok());
    }
    assert!(limiter.check("client").is_err());

    tokio::time::advance(Duration::from_secs(600)).await;
    let bucket = limiter.get_limiter("client");
    assert_eq!(bucket.available(), 3.0);
}

#[tokio::test(start_paused = true)]
async fn test_entries_expire_and_restart_full() {
    let limiter = RateLimiter::new(0.001, 1, Duration::from_secs(60));

    assert!(limiter.check("client").is_ok());
    assert!(limiter.check("client").is_err());
    assert_eq!(limiter.len(), 1);

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(limiter.is_empty());

    // A new entry starts with a full bucket
    assert!(limiter.check("client").is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_requests_share_one_bucket() {
    let limiter = Arc::new(RateLimiter::new(0.001, 10, HOUR));

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.check("burst-client").is_ok() })
        })
        .collect();

    let mut allowed = 0;
    for task in tasks {
        if task.await.unwrap() {
            allowed += 1;
        }
    }

    assert_eq!(allowed, 10);
    assert_eq!(limiter.len(), 1);
}

#[tokio::test]
async fn test_clones_share_state() {
    let limiter = RateLimiter::new(0.001, 1, HOUR);
    let clone = limiter.clone();

    assert!(limiter.check("client").is_ok());
    assert!(clone.check("client").is_err());
}
