//! Cache round-trip tests against a live Redis
//!
//! Ignored by default: they need a reachable Redis at `REDIS_URL`.
//! Run with `cargo test -p craftline-cache -- --ignored`.

use craftline_cache::{CacheConfig, CacheStore, CachedUser, UserCache};
use chrono::Utc;
use std::time::Duration;
use uuid::Uuid;

fn live_store() -> CacheStore {
    CacheStore::new(CacheConfig {
        url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
        // Generous budgets: these tests verify semantics, not latency.
        command_timeout: Duration::from_millis(200),
        connect_timeout: Duration::from_secs(1),
        default_ttl_secs: 60,
        reconnect_cooldown: Duration::from_secs(1),
    })
}

fn sample_user() -> CachedUser {
    CachedUser {
        id: Uuid::new_v4(),
        email: format!("{}@example.com", Uuid::new_v4()),
        display_name: Some("Live Test".into()),
        headline: None,
        avatar_url: None,
        is_recruiter: true,
        last_login_at: Some(Utc::now()),
        created_at: Utc::now(),
        cached_at: Utc::now(),
    }
}

#[tokio::test]
#[ignore = "requires a running Redis at REDIS_URL"]
async fn test_get_within_ttl_then_none_after_expiry() {
    let cache = UserCache::new(live_store());
    let user = sample_user();

    // ttl::USER is hours; use the raw store for a short-TTL entry.
    let store = live_store();
    let key = format!("v1:user:{}", user.id);
    assert!(store.put(&key, &user, 1).await);

    let within: Option<CachedUser> = store.get(&key).await;
    assert_eq!(within.as_ref().map(|u| u.id), Some(user.id));

    // 1s TTL plus up to 10% jitter; 2s is safely past expiry.
    tokio::time::sleep(Duration::from_secs(2)).await;
    let after: Option<CachedUser> = store.get(&key).await;
    assert_eq!(after, None);

    let _ = cache;
}

#[tokio::test]
#[ignore = "requires a running Redis at REDIS_URL"]
async fn test_invalidate_immediately_after_put() {
    let cache = UserCache::new(live_store());
    let user = sample_user();

    assert!(cache.set_user(&user).await);
    assert!(cache.invalidate_user(user.id).await);
    assert_eq!(cache.get_user(user.id).await, None);
}

#[tokio::test]
#[ignore = "requires a running Redis at REDIS_URL"]
async fn test_email_lookup_roundtrip_is_case_insensitive() {
    let cache = UserCache::new(live_store());
    let user = sample_user();

    assert!(cache.set_user_by_email(&user.email.to_uppercase(), user.id).await);
    assert_eq!(cache.get_user_by_email(&user.email).await, Some(user.id));

    assert!(cache.invalidate_user_by_email(&user.email).await);
    assert_eq!(cache.get_user_by_email(&user.email).await, None);
}

#[tokio::test]
#[ignore = "requires a running Redis at REDIS_URL"]
async fn test_corrupted_entry_reported_as_miss_and_dropped() {
    let store = live_store();
    let key = "v1:user:corrupted-entry-test";
    assert!(store.put(key, &"not a user record", 60).await);

    let got: Option<CachedUser> = store.get(key).await;
    assert_eq!(got, None);

    // The corrupted entry was deleted, not left to poison future reads.
    assert_eq!(store.get_raw(key).await, None);
}
