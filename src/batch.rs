use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("gauge {name:?} has a non-finite value")]
    NonFiniteValue { name: String },

    #[error("failed to serialize batch: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A single point-in-time measurement. The name is stored lower-cased and the
/// timestamp is captured when the record is created, not when it is uploaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeRecord {
    pub name: String,
    pub value: f64,
    pub measure_time: i64,
}

impl GaugeRecord {
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_lowercase(),
            value,
            measure_time: unix_now(),
        }
    }
}

/// One upload's worth of gauges. Built fresh per flush cycle and discarded
/// once the request completes or fails — there is no retry path.
///
/// Gauge order must match dequeue order; the endpoint treats the sequence
/// as-is and reordering would skew same-named series.
#[derive(Debug, Serialize)]
pub struct Batch<'a> {
    pub measure_time: i64,
    pub source: &'a str,
    pub gauges: Vec<GaugeRecord>,
}

impl<'a> Batch<'a> {
    pub fn new(source: &'a str, gauges: Vec<GaugeRecord>) -> Self {
        Self {
            measure_time: unix_now(),
            source,
            gauges,
        }
    }

    /// Serialize to the JSON wire form.
    ///
    /// Non-finite values are rejected up front: serde_json would emit `null`
    /// for them, which the endpoint rejects with an opaque 400.
    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        if let Some(bad) = self.gauges.iter().find(|g| !g.value.is_finite()) {
            return Err(EncodeError::NonFiniteValue {
                name: bad.name.clone(),
            });
        }
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }
}

/// Wall clock as unix seconds. Saturates to 0 for a pre-epoch clock.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
