use std::time::Duration;

use thiserror::Error;
use url::Url;

/// The production Librato ingestion endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://metrics-api.librato.com/v1/metrics";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("source must not be empty")]
    EmptySource,

    #[error("buffer capacity must be at least 1")]
    ZeroBufferCapacity,

    #[error("batch limit must be at least 1")]
    ZeroBatchLimit,

    #[error("flushes per tick must be at least 1")]
    ZeroFlushesPerTick,

    #[error("flush interval must be non-zero")]
    ZeroFlushInterval,
}

/// Collector settings. Immutable once handed to [`Collector::new`].
///
/// `batch_limit` and `flushes_per_tick` together set the burst drain
/// capacity: up to `batch_limit * flushes_per_tick` gauges leave the buffer
/// per interval tick. The defaults (250 × 4) deliberately over-provision
/// relative to typical steady-state load.
///
/// [`Collector::new`]: crate::Collector::new
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: Url,
    pub username: String,
    pub token: String,
    pub source: String,
    pub flush_interval: Duration,
    pub http_timeout: Duration,
    pub buffer_capacity: usize,
    pub batch_limit: usize,
    pub flushes_per_tick: usize,
}

impl Config {
    pub fn new(
        username: impl Into<String>,
        token: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint URL is valid"),
            username: username.into(),
            token: token.into(),
            source: source.into(),
            flush_interval: Duration::from_secs(10),
            http_timeout: Duration::from_secs(30),
            buffer_capacity: 10_000,
            batch_limit: 250,
            flushes_per_tick: 4,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.is_empty() {
            return Err(ConfigError::EmptySource);
        }
        if self.buffer_capacity == 0 {
            return Err(ConfigError::ZeroBufferCapacity);
        }
        if self.batch_limit == 0 {
            return Err(ConfigError::ZeroBatchLimit);
        }
        if self.flushes_per_tick == 0 {
            return Err(ConfigError::ZeroFlushesPerTick);
        }
        if self.flush_interval.is_zero() {
            return Err(ConfigError::ZeroFlushInterval);
        }
        Ok(())
    }
}
