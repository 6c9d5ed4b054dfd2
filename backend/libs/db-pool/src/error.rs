//! Database layer error types

use crate::url::UrlError;
use std::time::Duration;
use thiserror::Error;

/// Message returned to business-layer callers for any runtime database
/// failure. Fine-grained causes stay in the logs.
pub const UNAVAILABLE_MESSAGE: &str = "service temporarily unavailable, please retry";

/// Source of a configuration failure: caught locally during URL validation,
/// or reported by the server on an otherwise healthy connection.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Url(#[from] UrlError),
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),
    #[error("server rejected database target: {0}")]
    Rejected(#[source] sqlx::Error),
}

#[derive(Error, Debug)]
pub enum DbError {
    /// Malformed or contradictory connection parameters. Fatal at startup,
    /// never retried.
    #[error("invalid database configuration: {0}")]
    Config(#[from] ConfigError),

    /// Network-level failure during connect or query. Retried with bounded
    /// backoff, then surfaced as one coalesced failure.
    #[error("database unreachable after {attempts} attempt(s) over {elapsed:?}: {source}")]
    Transient {
        attempts: u32,
        elapsed: Duration,
        #[source]
        source: sqlx::Error,
    },

    /// Credentials or TLS negotiation rejected by the server. Never retried;
    /// logged with a distinct signature so it cannot be mistaken for flapping.
    #[error("database rejected credentials or TLS negotiation: {source}")]
    AuthFailed {
        #[source]
        source: sqlx::Error,
    },
}

pub type DbResult<T> = Result<T, DbError>;

impl From<UrlError> for DbError {
    fn from(err: UrlError) -> Self {
        DbError::Config(ConfigError::Url(err))
    }
}

impl DbError {
    /// Generic message safe to echo to end users. Configuration errors are
    /// startup-fatal and never reach request handling, so they map here too
    /// for completeness.
    pub fn user_message(&self) -> &'static str {
        UNAVAILABLE_MESSAGE
    }

    /// Whether another connect attempt could reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::Transient { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_never_leaks_detail() {
        let err = DbError::Transient {
            attempts: 3,
            elapsed: Duration::from_secs(2),
            source: sqlx::Error::PoolTimedOut,
        };
        assert_eq!(err.user_message(), UNAVAILABLE_MESSAGE);
        assert!(!err.user_message().contains("attempt"));
    }

    #[test]
    fn test_retryability() {
        let transient = DbError::Transient {
            attempts: 1,
            elapsed: Duration::from_millis(10),
            source: sqlx::Error::PoolTimedOut,
        };
        assert!(transient.is_retryable());

        let auth = DbError::AuthFailed {
            source: sqlx::Error::PoolTimedOut,
        };
        assert!(!auth.is_retryable());
    }
}
