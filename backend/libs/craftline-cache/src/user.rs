//! User profile caching
//!
//! The authentication path is the hottest read in the platform: every token
//! refresh used to cost a full user-row lookup. This module keeps a TTL'd
//! snapshot in front of it. All timestamp fields serialize as RFC 3339
//! strings (chrono's serde default) for wire compatibility with the other
//! consumers of these entries.

use crate::{ttl, CacheKey, CacheStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cached user profile snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedUser {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    /// Profile tagline, e.g. "Senior Backend Engineer".
    pub headline: Option<String>,
    pub avatar_url: Option<String>,
    pub is_recruiter: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub cached_at: DateTime<Utc>,
}

/// Typed cache-aside operations for user records.
///
/// Lifecycle contract with callers: an entry is written on
/// cache-miss-then-DB-read, refreshed on successful login, and invalidated
/// on profile mutation before the mutation is acknowledged. Every method
/// degrades to its sentinel when the backend is down.
#[derive(Clone)]
pub struct UserCache {
    store: CacheStore,
}

impl UserCache {
    pub fn new(store: CacheStore) -> Self {
        Self { store }
    }

    /// Get a cached user by id.
    pub async fn get_user(&self, user_id: Uuid) -> Option<CachedUser> {
        self.store.get(&CacheKey::user(user_id)).await
    }

    /// Cache a user profile snapshot.
    pub async fn set_user(&self, user: &CachedUser) -> bool {
        self.store.put(&CacheKey::user(user.id), user, ttl::USER).await
    }

    /// Drop a user's cache entry. Runs to completion (or definitive failure)
    /// so the caller can sequence it strictly before acknowledging the
    /// profile mutation that triggered it.
    pub async fn invalidate_user(&self, user_id: Uuid) -> bool {
        self.store.invalidate(&CacheKey::user(user_id)).await
    }

    /// Look up a user id by email (case-insensitive).
    pub async fn get_user_by_email(&self, email: &str) -> Option<Uuid> {
        self.store.get(&CacheKey::user_by_email(email)).await
    }

    /// Cache an email -> user id mapping.
    pub async fn set_user_by_email(&self, email: &str, user_id: Uuid) -> bool {
        self.store
            .put(&CacheKey::user_by_email(email), &user_id, ttl::USER_LOOKUP)
            .await
    }

    /// Drop an email lookup entry.
    pub async fn invalidate_user_by_email(&self, email: &str) -> bool {
        self.store.invalidate(&CacheKey::user_by_email(email)).await
    }
}
