use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use reqwest::StatusCode;

use crate::uploader::{UploadError, Uploader};

/// Records the payload of every successful upload. The first `fail_first`
/// calls are rejected with a 500 instead, without recording — the batch is
/// gone, exactly like a real rejection.
#[derive(Default)]
pub struct RecordingUploader {
    attempts: AtomicUsize,
    fail_first: AtomicUsize,
    payloads: Mutex<Vec<Bytes>>,
}

impl RecordingUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_first(n: usize) -> Self {
        Self {
            fail_first: AtomicUsize::new(n),
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn bodies(&self) -> Vec<serde_json::Value> {
        self.payloads
            .lock()
            .unwrap()
            .iter()
            .map(|p| serde_json::from_slice(p).unwrap())
            .collect()
    }

    /// Every gauge name across all recorded payloads, in upload order.
    pub fn gauge_names(&self) -> Vec<String> {
        self.bodies()
            .into_iter()
            .flat_map(|body| {
                body["gauges"]
                    .as_array()
                    .map(|gauges| {
                        gauges
                            .iter()
                            .map(|g| g["name"].as_str().unwrap_or_default().to_owned())
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default()
            })
            .collect()
    }
}

impl Uploader for RecordingUploader {
    fn upload(&self, body: Bytes) -> impl Future<Output = Result<(), UploadError>> + Send {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let fail = self
            .fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !fail {
            self.payloads.lock().unwrap().push(body);
        }
        async move {
            if fail {
                Err(UploadError::Rejected {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                })
            } else {
                Ok(())
            }
        }
    }
}
