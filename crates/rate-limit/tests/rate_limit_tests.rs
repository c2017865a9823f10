use std::sync::Arc;
use std::time::Duration;

use ttlgate_rate_limit::{FixedWindowLimiter, RateLimiter};
use ttlgate_store::CounterStore;

fn limiter(scope: &str, capacity: i64, window: Duration) -> FixedWindowLimiter {
    FixedWindowLimiter::new(scope, capacity, window, Arc::new(CounterStore::new())).unwrap()
}

#[tokio::test]
async fn test_fixed_window_basic() {
    let limiter = limiter("test-client", 3, Duration::from_secs(60));

    assert!(limiter.allow());
    assert!(limiter.allow());
    assert!(limiter.allow());

    // 4th request should be denied
    assert!(!limiter.allow());
}

#[tokio::test]
async fn test_fixed_window_resets_after_window() {
    let limiter = limiter("test-client", 1, Duration::from_millis(50));

    assert!(limiter.allow());
    for _ in 0..5 {
        assert!(!limiter.allow());
    }

    tokio::time::sleep(Duration::from_millis(75)).await;
    assert!(limiter.allow());
    limiter.shutdown().await;
}

#[tokio::test]
async fn test_fixed_window_different_identities() {
    let limiter = limiter("verify-otp", 2, Duration::from_secs(60));

    assert!(limiter.allow_for("+15550100"));
    assert!(limiter.allow_for("+15550100"));
    assert!(!limiter.allow_for("+15550100"));

    // Different identity should have its own counter
    assert!(limiter.allow_for("+15550101"));
    assert!(limiter.allow_for("+15550101"));
    assert!(!limiter.allow_for("+15550101"));
}

#[tokio::test]
async fn test_dropped_limiter_stops_resetting() {
    let store = Arc::new(CounterStore::new());
    let limiter =
        FixedWindowLimiter::new("dropped", 2, Duration::from_millis(20), store.clone()).unwrap();

    assert!(limiter.allow());
    assert!(limiter.allow());
    drop(limiter);

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(store.get("dropped::rate-limiter::fixed-window::bucket").unwrap(), 0);
}
