//! Bounded-backoff first-use connector
//!
//! Connect attempts are bounded twice: by attempt count and by total wall
//! clock. There is deliberately no background keepalive loop; this runs only
//! from explicit startup warm-up and the pool's first real use.

use crate::config::DbConfig;
use crate::error::{DbError, DbResult};
use crate::pool::PoolPolicy;
use rand::Rng;
use sqlx::PgPool;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// How a connect failure should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Timeout, refused connection, DNS failure, dropped socket. Worth
    /// retrying with backoff.
    Transient,
    /// Credentials or TLS rejected by the server. Retrying would only trip
    /// intrusion alarms; fail immediately.
    Auth,
    /// The server answered but the target database does not exist. A config
    /// problem, not an outage.
    Config,
}

/// Classify a connect-path error by sqlx variant and SQLSTATE.
pub fn classify_connect_error(err: &sqlx::Error) -> FailureClass {
    match err {
        sqlx::Error::Tls(_) => FailureClass::Auth,
        sqlx::Error::Database(db) => match db.code().as_deref() {
            // Class 28: invalid authorization specification.
            Some(code) if code.starts_with("28") => FailureClass::Auth,
            // 3D000: the database itself is missing.
            Some("3D000") => FailureClass::Config,
            _ => FailureClass::Transient,
        },
        // Malformed options or an unusable URL; no retry can fix it.
        sqlx::Error::Configuration(_) => FailureClass::Config,
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Protocol(_) => FailureClass::Transient,
        _ => FailureClass::Transient,
    }
}

/// Exponential-backoff connector used for startup warm-up and lazy first use.
#[derive(Debug, Clone)]
pub struct RetryingConnector {
    /// Maximum connect attempts (first try included).
    pub max_attempts: u32,
    /// Hard wall-clock budget across all attempts and backoff sleeps.
    pub max_total_wait: Duration,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Backoff multiplier between attempts.
    pub backoff_multiplier: f64,
    /// Cap for a single backoff sleep.
    pub max_backoff: Duration,
    /// Add ±30% random jitter to each sleep.
    pub jitter: bool,
}

impl Default for RetryingConnector {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            max_total_wait: Duration::from_secs(20),
            initial_backoff: Duration::from_millis(200),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(5),
            jitter: true,
        }
    }
}

impl RetryingConnector {
    /// Connect and verify the pooled engine, retrying transient failures.
    ///
    /// Authentication and TLS rejections fail on the first occurrence with a
    /// distinct error. Exhausted attempts coalesce into a single
    /// [`DbError::Transient`] carrying the last underlying cause.
    pub async fn connect_with_retry(&self, config: &DbConfig) -> DbResult<PgPool> {
        let policy = PoolPolicy::from_config(config);
        let canonical = config.canonical_url()?;
        let deadline = Instant::now() + self.max_total_wait;
        let started = Instant::now();
        let mut backoff = self.initial_backoff;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match crate::pool::connect_once(&canonical, &policy, config).await {
                Ok(pool) => {
                    info!(
                        service = %config.service_name,
                        attempt,
                        "database pool connected and verified"
                    );
                    return Ok(pool);
                }
                Err(err) => match classify_connect_error(&err) {
                    FailureClass::Auth => {
                        // Distinct signature from transient noise; alerting
                        // keys off this event.
                        warn!(
                            service = %config.service_name,
                            error = %err,
                            "database authentication/TLS rejected; not retrying"
                        );
                        return Err(DbError::AuthFailed { source: err });
                    }
                    FailureClass::Config => {
                        warn!(
                            service = %config.service_name,
                            error = %err,
                            "database configuration rejected by server; not retrying"
                        );
                        return Err(DbError::Config(
                            crate::error::ConfigError::Rejected(err),
                        ));
                    }
                    FailureClass::Transient => {
                        let delay = self.next_delay(backoff);
                        let out_of_attempts = attempt >= self.max_attempts;
                        let out_of_time = Instant::now() + delay > deadline;
                        if out_of_attempts || out_of_time {
                            warn!(
                                service = %config.service_name,
                                attempts = attempt,
                                elapsed = ?started.elapsed(),
                                error = %err,
                                "database unreachable; retry budget exhausted"
                            );
                            return Err(DbError::Transient {
                                attempts: attempt,
                                elapsed: started.elapsed(),
                                source: err,
                            });
                        }

                        warn!(
                            service = %config.service_name,
                            attempt,
                            max_attempts = self.max_attempts,
                            delay = ?delay,
                            error = %err,
                            "database connect failed; backing off"
                        );
                        tokio::time::sleep(delay).await;
                        backoff = Duration::from_millis(
                            ((backoff.as_millis() as f64 * self.backoff_multiplier)
                                .min(self.max_backoff.as_millis() as f64))
                                as u64,
                        );
                    }
                },
            }
        }
    }

    fn next_delay(&self, base: Duration) -> Duration {
        if self.jitter {
            let mut rng = rand::thread_rng();
            let factor = 1.0 + rng.gen_range(-0.3..0.3);
            Duration::from_millis((base.as_millis() as f64 * factor) as u64)
        } else {
            base
        }
    }
}
