//! Background batching and upload of gauge metrics to the [Librato] API.
//!
//! Application code records named gauge observations; a background worker
//! batches them and POSTs one JSON payload per flush cycle. Delivery is
//! best-effort and at-most-once: a full buffer drops new records, a failed
//! upload drops its batch, and neither ever blocks or panics the caller.
//!
//! The crate can be used through an owned [`Collector`] handle, or through
//! the process-wide functions below. The process-wide surface is entirely
//! inert until [`configure`] is called, so libraries can emit gauges
//! unconditionally and let the host application decide whether metrics are
//! enabled at all.
//!
//! ```no_run
//! # async fn demo() {
//! use std::time::Duration;
//!
//! let mut config = librato_relay::Config::new("alice", "api-token", "host-1");
//! config.flush_interval = Duration::from_secs(5);
//!
//! librato_relay::configure(config);
//! librato_relay::start();
//!
//! librato_relay::gauge("requests.active", 17.0);
//!
//! librato_relay::stop();
//! librato_relay::join().await;
//! # }
//! ```
//!
//! [Librato]: https://www.librato.com/docs/api/#metrics

mod batch;
mod buffer;
mod collector;
mod config;
mod uploader;

#[cfg(test)]
mod testing;

use std::sync::RwLock;

use tracing::error;

pub use batch::{Batch, EncodeError, GaugeRecord};
pub use collector::Collector;
pub use config::{Config, ConfigError, DEFAULT_ENDPOINT};
pub use uploader::{HttpUploader, UploadError, Uploader};

static GLOBAL: RwLock<Option<Collector>> = RwLock::new(None);

/// Install the process-wide collector. Intended to be called once during
/// application startup, before [`start`].
///
/// An invalid configuration is reported through the log and leaves metrics
/// disabled; it never panics the host application.
pub fn configure(config: Config) {
    match Collector::new(config) {
        Ok(collector) => *GLOBAL.write().unwrap() = Some(collector),
        Err(e) => error!(error = %e, "invalid collector configuration, metrics disabled"),
    }
}

/// Start the process-wide collector's background worker.
/// A no-op when [`configure`] has not been called.
pub fn start() {
    if let Some(collector) = GLOBAL.read().unwrap().as_ref() {
        collector.start();
    }
}

/// Record a gauge on the process-wide collector.
/// A no-op when [`configure`] has not been called.
pub fn gauge(name: &str, value: f64) {
    if let Some(collector) = GLOBAL.read().unwrap().as_ref() {
        collector.gauge(name, value);
    }
}

/// Signal the process-wide collector to drain and shut down.
/// A no-op when [`configure`] has not been called.
pub fn stop() {
    if let Some(collector) = GLOBAL.read().unwrap().as_ref() {
        collector.stop();
    }
}

/// Wait for the process-wide collector's worker to exit after [`stop`].
/// Completes immediately when [`configure`] has not been called.
pub async fn join() {
    let collector = GLOBAL.read().unwrap().clone();
    if let Some(collector) = collector {
        collector.join().await;
    }
}
