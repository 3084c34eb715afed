use chrono::{TimeZone, Utc};
use floodgate::antiflood::ManualClock;
use floodgate::store::InMemoryCounterStore;
use floodgate::{Actor, AntiFlood, AntiFloodConfig, CounterStore, FloodgateError};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(3600);

fn limiter() -> (AntiFlood<Arc<InMemoryCounterStore>>, ManualClock) {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 9, 8, 0, 15).unwrap());
    let store = Arc::new(InMemoryCounterStore::default());
    let limiter = AntiFlood::new(store, AntiFloodConfig::default()).with_clock(clock.clone());
    (limiter, clock)
}

#[tokio::test]
async fn test_download_scenario() {
    let (limiter, _clock) = limiter();
    let user = Actor::user("user42");

    let mut results = Vec::new();
    for _ in 0..3 {
        results.push(
            limiter
                .check(&user, "website-download", Some(2), Some(HOUR))
                .await
                .unwrap(),
        );
    }

    assert_eq!(results, vec![true, true, false]);
    assert_eq!(
        limiter.get_record(&user, "website-download").await.unwrap(),
        Some(3)
    );
}

#[tokio::test]
async fn test_counting_is_monotonic() {
    let (limiter, _clock) = limiter();
    let user = Actor::user("7");

    for n in 1..=15 {
        let attempt = limiter.hit(&user, "search", Some(10), None).await.unwrap();
        assert_eq!(attempt.count, n);
        assert_eq!(attempt.allowed, n <= 10);
    }
}

#[tokio::test]
async fn test_buckets_are_isolated() {
    let (limiter, _clock) = limiter();
    let alice = Actor::user("alice");
    let bob = Actor::user("bob");

    limiter.check(&alice, "login", None, None).await.unwrap();
    limiter.check(&alice, "login", None, None).await.unwrap();
    limiter.check(&alice, "upload", None, None).await.unwrap();

    assert_eq!(limiter.get_record(&alice, "login").await.unwrap(), Some(2));
    assert_eq!(limiter.get_record(&alice, "upload").await.unwrap(), Some(1));
    assert_eq!(limiter.get_record(&bob, "login").await.unwrap(), None);
}

#[tokio::test]
async fn test_reset_starts_over() {
    let (limiter, _clock) = limiter();
    let user = Actor::user("42");

    for _ in 0..3 {
        limiter.check(&user, "login", Some(2), None).await.unwrap();
    }
    assert!(limiter.delete_record(&user, "login").await.unwrap());
    assert_eq!(limiter.get_record(&user, "login").await.unwrap(), None);

    let attempt = limiter.hit(&user, "login", Some(2), None).await.unwrap();
    assert_eq!(attempt.count, 1);
    assert!(attempt.allowed);
}

#[tokio::test]
async fn test_next_minute_uses_new_bucket() {
    let (limiter, clock) = limiter();
    let user = Actor::user("42");

    for _ in 0..3 {
        limiter.check(&user, "login", Some(2), None).await.unwrap();
    }
    clock.advance(chrono::Duration::seconds(60));

    assert!(limiter.check(&user, "login", Some(2), None).await.unwrap());
    assert_eq!(limiter.get_record(&user, "login").await.unwrap(), Some(1));
}

#[tokio::test]
async fn test_anonymous_requests_count_against_ip() {
    let (limiter, _clock) = limiter();
    let ip = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7));

    assert!(limiter.is_allowed(None, ip, "login", Some(1), None).await.unwrap());
    assert!(!limiter.is_allowed(Some(""), ip, "login", Some(1), None).await.unwrap());
    assert!(limiter.is_allowed(Some("42"), ip, "login", Some(1), None).await.unwrap());

    assert_eq!(
        limiter.get_record(&Actor::ip(ip), "login").await.unwrap(),
        Some(2)
    );
}

#[tokio::test]
async fn test_counter_expires_with_window() {
    let (limiter, _clock) = limiter();
    let user = Actor::user("42");

    limiter
        .check(&user, "login", Some(1), Some(Duration::from_millis(50)))
        .await
        .unwrap();
    assert!(limiter.get_timestamp(&user, "login").await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(limiter.get_record(&user, "login").await.unwrap(), None);
    assert_eq!(limiter.get_timestamp(&user, "login").await.unwrap(), None);
}

#[tokio::test]
async fn test_guard_refuses_with_too_many_requests() {
    let (limiter, _clock) = limiter();
    let user = Actor::user("42");

    limiter.guard(&user, "reset-password", Some(1), None).await.unwrap();
    let err = limiter
        .guard(&user, "reset-password", Some(1), None)
        .await
        .unwrap_err();

    assert!(matches!(err, FloodgateError::TooManyRequests(_)));
    assert_eq!(err.status_code(), axum::http::StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_instances_sharing_a_store_share_counts() {
    let store = Arc::new(InMemoryCounterStore::default());
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 9, 8, 0, 0).unwrap());
    let first = AntiFlood::new(store.clone(), AntiFloodConfig::default()).with_clock(clock.clone());
    let second = AntiFlood::new(store.clone(), AntiFloodConfig::default()).with_clock(clock);
    let user = Actor::user("42");

    assert!(first.check(&user, "login", Some(2), None).await.unwrap());
    assert!(second.check(&user, "login", Some(2), None).await.unwrap());
    assert!(!first.check(&user, "login", Some(2), None).await.unwrap());

    assert_eq!(
        store.get("antiflood:42:login:202506090800").await.unwrap(),
        Some(3)
    );
}

#[tokio::test]
async fn test_concurrent_checks_count_every_attempt() {
    let (limiter, _clock) = limiter();
    let user = Actor::user("42");

    let mut handles = Vec::new();
    for _ in 0..20 {
        let limiter = limiter.clone();
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            limiter.check(&user, "login", Some(5), None).await.unwrap()
        }));
    }

    let mut allowed = 0;
    for handle in handles {
        if handle.await.unwrap() {
            allowed += 1;
        }
    }

    assert_eq!(allowed, 5);
    assert_eq!(limiter.get_record(&user, "login").await.unwrap(), Some(20));
}
