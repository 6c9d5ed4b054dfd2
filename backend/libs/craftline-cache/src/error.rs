//! Internal cache error types
//!
//! Nothing here crosses the crate boundary: the public API degrades every
//! failure to a miss or a `false` sentinel. These types exist so the internal
//! plumbing can use `?` and log precise causes.

use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cache command timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("cache backend unavailable")]
    Unavailable,
}

pub(crate) type CacheResult<T> = Result<T, CacheError>;
