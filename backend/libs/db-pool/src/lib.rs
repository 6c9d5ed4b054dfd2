//! Database connection lifecycle for Craftline services
//!
//! Hosting is ephemeral and the database is a shared managed Postgres, so the
//! pool is lazy (nothing dials out at import time), strictly budgeted
//! (`pool_size + max_overflow`, pre-ping, recycle), and warmed through a
//! bounded-retry connector. Health probes live elsewhere on purpose and never
//! reach into this crate.

mod config;
mod error;
mod pool;
mod retry;
pub mod url;

pub use config::{parse_env_optional, parse_env_with_default, DbConfig};
pub use error::{ConfigError, DbError, DbResult, UNAVAILABLE_MESSAGE};
pub use pool::{Connector, LazyPool, PoolPolicy};
pub use retry::{classify_connect_error, FailureClass, RetryingConnector};
pub use url::{normalize, normalize_with, CanonicalUrl, DriverMode, HostPolicy, SslMode};
