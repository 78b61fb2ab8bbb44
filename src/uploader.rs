use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint rejected batch: {status}")]
    Rejected { status: StatusCode },
}

/// The transport seam: one authenticated POST of an encoded batch.
///
/// The background worker is generic over this, so tests can substitute a
/// recording or failing implementation for the real client.
pub trait Uploader {
    fn upload(&self, body: Bytes) -> impl Future<Output = Result<(), UploadError>> + Send;
}

impl<U: Uploader + Send + Sync> Uploader for Arc<U> {
    fn upload(&self, body: Bytes) -> impl Future<Output = Result<(), UploadError>> + Send {
        (**self).upload(body)
    }
}

/// Posts batches to the configured endpoint with HTTP basic auth.
pub struct HttpUploader {
    client: Client,
    endpoint: Url,
    username: String,
    token: String,
}

impl HttpUploader {
    pub fn new(config: &Config) -> Self {
        // Idempotent; only the first caller in the process actually installs.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            endpoint: config.endpoint.clone(),
            username: config.username.clone(),
            token: config.token.clone(),
        }
    }
}

impl Uploader for HttpUploader {
    fn upload(&self, body: Bytes) -> impl Future<Output = Result<(), UploadError>> + Send {
        async move {
            let resp = self
                .client
                .post(self.endpoint.clone())
                .basic_auth(&self.username, Some(&self.token))
                .header("content-type", "application/json")
                .body(body)
                .send()
                .await?;

            let status = resp.status();
            // Read the body to completion so the connection goes back to the pool.
            let _ = resp.bytes().await;

            // The endpoint answers 200 or 201 on success; anything else is a
            // rejection, including other 2xx codes.
            if status == StatusCode::OK || status == StatusCode::CREATED {
                Ok(())
            } else {
                Err(UploadError::Rejected { status })
            }
        }
    }
}
