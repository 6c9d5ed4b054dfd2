//! Cache key schema
//!
//! Key format: `v{VERSION}:{entity}:{identifier}[:sub_key]`. All services go
//! through these generators; ad hoc key strings drift and then invalidation
//! misses them.

use uuid::Uuid;

/// Cache schema version - increment when changing key formats.
pub const CACHE_VERSION: u32 = 1;

/// Cache key builder.
pub struct CacheKey;

impl CacheKey {
    /// User profile snapshot, the hot authentication-path entry.
    /// Format: `v1:user:{user_id}`
    pub fn user(user_id: Uuid) -> String {
        format!("v{}:user:{}", CACHE_VERSION, user_id)
    }

    /// Email -> user id lookup. Email is the business identifier callers
    /// type, so it is case-normalized here and nowhere else.
    /// Format: `v1:user:email:{lowercased}`
    pub fn user_by_email(email: &str) -> String {
        format!(
            "v{}:user:email:{}",
            CACHE_VERSION,
            email.trim().to_lowercase()
        )
    }
}
