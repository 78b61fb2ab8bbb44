use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::batch::{Batch, GaugeRecord};
use crate::buffer::GaugeBuffer;
use crate::config::{Config, ConfigError};
use crate::uploader::{HttpUploader, Uploader};

enum State {
    Idle,
    Running,
    Stopped,
}

struct Inner<U> {
    config: Config,
    buffer: GaugeBuffer,
    uploader: U,
    /// Stop signal: `stop()` cancels, the worker observes it cooperatively.
    cancel: CancellationToken,
    /// Completion signal: fired by the worker once the final drain is done,
    /// awaited by `join()`. Kept separate from `cancel` so that signalling a
    /// stop and waiting for termination stay independent.
    done: CancellationToken,
    state: Mutex<State>,
}

/// Handle to the gauge pipeline: enqueue on any task, flush in the background.
///
/// Cheap to clone; all clones share the same buffer and worker. A
/// [`Collector::disabled`] handle carries no pipeline at all and turns every
/// operation into a no-op, so metrics can be conditionally enabled without
/// branching at each call site.
pub struct Collector<U = HttpUploader> {
    inner: Option<Arc<Inner<U>>>,
}

impl<U> Clone for Collector<U> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Collector {
    /// Build a collector that uploads over HTTP to `config.endpoint`.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let uploader = HttpUploader::new(&config);
        Self::with_uploader(config, uploader)
    }

    /// A collector whose every operation is a safe no-op.
    pub fn disabled() -> Self {
        Self { inner: None }
    }
}

impl<U: Uploader + Send + Sync + 'static> Collector<U> {
    /// Build a collector over a custom transport.
    pub fn with_uploader(config: Config, uploader: U) -> Result<Self, ConfigError> {
        config.validate()?;
        let buffer = GaugeBuffer::new(config.buffer_capacity);
        Ok(Self {
            inner: Some(Arc::new(Inner {
                config,
                buffer,
                uploader,
                cancel: CancellationToken::new(),
                done: CancellationToken::new(),
                state: Mutex::new(State::Idle),
            })),
        })
    }

    /// Spawn the background flush worker. Must be called from within a tokio
    /// runtime; outside one the failure is reported and the collector stays
    /// idle rather than panicking. Starting twice is rejected — there is
    /// exactly one worker per collector.
    pub fn start(&self) {
        let Some(inner) = &self.inner else { return };
        let mut state = inner.state.lock().unwrap();
        if !matches!(*state, State::Idle) {
            warn!("gauge collector already started");
            return;
        }
        let Ok(handle) = Handle::try_current() else {
            error!("no tokio runtime available, gauge collector not started");
            return;
        };
        *state = State::Running;
        handle.spawn(run(Arc::clone(inner)));
    }

    /// Record a measurement. Never blocks: a full buffer rejects the record
    /// synchronously and the drop is reported through the log. The name is
    /// normalized to lower case before storage.
    ///
    /// Callable in any state. Before `start()` or after the worker has
    /// stopped the buffer may still accept records, but nothing will flush
    /// them.
    pub fn gauge(&self, name: &str, value: f64) {
        let Some(inner) = &self.inner else { return };
        if name.is_empty() {
            warn!("gauge with empty name dropped");
            return;
        }
        if !inner.buffer.push(GaugeRecord::new(name, value)) {
            warn!(
                name,
                "gauge buffer full, dropping measurement; increase the buffer \
                 capacity or shorten the flush interval"
            );
        }
    }

    /// Signal the worker to drain the buffer and exit. Returns immediately;
    /// use [`join`](Self::join) to wait for full termination.
    pub fn stop(&self) {
        if let Some(inner) = &self.inner {
            inner.cancel.cancel();
        }
    }

    /// Wait until the background worker has fully exited, which guarantees
    /// the buffer was drained. Completes immediately for a disabled or
    /// never-started collector.
    pub async fn join(&self) {
        let Some(inner) = &self.inner else { return };
        if matches!(*inner.state.lock().unwrap(), State::Idle) {
            return;
        }
        inner.done.cancelled().await;
    }
}

async fn run<U: Uploader + Send + Sync>(inner: Arc<Inner<U>>) {
    // Fires `done` even if this task panics.
    let _completion = inner.done.clone().drop_guard();

    info!(source = %inner.config.source, "gauge collector started");

    let mut interval = tokio::time::interval(inner.config.flush_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of a tokio interval completes immediately; consume it
    // so the first flush happens one full interval after start.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = inner.cancel.cancelled() => break,
            _ = interval.tick() => {
                // Several cycles per tick so a burst of up to
                // batch_limit * flushes_per_tick records drains in one pass.
                for _ in 0..inner.config.flushes_per_tick {
                    flush_cycle(&inner.config, &inner.buffer, &inner.uploader).await;
                }
            }
        }
    }

    // Final drain. Each cycle removes records whether or not the upload
    // succeeds, so this terminates even against a dead endpoint.
    while !inner.buffer.is_empty() {
        flush_cycle(&inner.config, &inner.buffer, &inner.uploader).await;
    }

    *inner.state.lock().unwrap() = State::Stopped;
    info!("gauge collector stopped");
}

/// One flush cycle: drain up to `batch_limit` records and issue at most one
/// upload. A cycle over an empty buffer does nothing — no payload is built
/// and no request leaves the process.
///
/// Failures of any kind drop the batch. Delivery is at-most-once; a gauge
/// that reached a batch is never re-enqueued.
async fn flush_cycle<U: Uploader>(config: &Config, buffer: &GaugeBuffer, uploader: &U) {
    let gauges = buffer.drain_up_to(config.batch_limit);
    if gauges.is_empty() {
        return;
    }

    let count = gauges.len();
    let batch = Batch::new(&config.source, gauges);
    let body = match batch.encode() {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, count, "failed to encode gauge batch, batch dropped");
            return;
        }
    };

    match uploader.upload(body).await {
        Ok(()) => debug!(count, "flushed gauges"),
        Err(e) => error!(error = %e, count, "failed to upload gauge batch, batch dropped"),
    }
}
