//! HTTP client for the snap sync endpoint.
//!
//! Posts each batch as a JSON array in the request body, with the
//! destination mail address carried in the `configured-mailto` header.
//! Handles timeout management and classifies every attempt into a
//! `BatchOutcome`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, warn};

use ms_core::config::{AppConfig, ServerConfig};
use ms_core::constants::MAILTO_HEADER;
use ms_core::error::{MsError, MsResult};
use ms_models::SnapPayload;

use crate::transport::{BatchOutcome, BatchTransport};

/// HTTP client for posting snap batches.
#[derive(Clone)]
pub struct ApiClient {
    inner: Client,
    /// Full endpoint URL the batches are posted to.
    endpoint: String,
    /// Path of the offline fallback page.
    offline_path: String,
    /// Per-request timeout.
    timeout: Duration,
}

impl ApiClient {
    /// Create a new ApiClient from server configuration.
    pub fn new(config: &ServerConfig) -> MsResult<Self> {
        let endpoint = AppConfig::sanitize_endpoint(&config.endpoint);
        if endpoint.is_empty() {
            return Err(MsError::MissingConfig("server.endpoint".into()));
        }

        let timeout = Duration::from_millis(config.api_timeout_ms);
        let inner = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(15))
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| MsError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner,
            endpoint,
            offline_path: config.offline_path.clone(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST a pre-serialized body to the endpoint.
    async fn send(&self, mail_to: &str, body: String) -> MsResult<Response> {
        debug!("POST {} ({} bytes)", self.endpoint, body.len());

        self.inner
            .post(&self.endpoint)
            .header(MAILTO_HEADER, mail_to)
            .body(body)
            .send()
            .await
            .map_err(Self::classify_error)
    }

    /// Classify a reqwest error into an MsError.
    fn classify_error(e: reqwest::Error) -> MsError {
        if e.is_timeout() {
            MsError::Timeout(e.to_string())
        } else if e.is_connect() {
            MsError::Network(format!("connection failed: {e}"))
        } else if let Some(status) = e.status() {
            MsError::ServerError {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            MsError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl BatchTransport for ApiClient {
    async fn post_batch(&self, mail_to: &str, batch: &[SnapPayload]) -> MsResult<BatchOutcome> {
        let body = serde_json::to_string(batch)?;

        let response = match self.send(mail_to, body).await {
            Ok(response) => response,
            Err(e) => {
                warn!("batch of {} not delivered: {e}", batch.len());
                return Ok(BatchOutcome::from_transport_error(&e));
            }
        };

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!("failed to read response body: {e}");
                return Ok(BatchOutcome::from_transport_error(&Self::classify_error(e)));
            }
        };

        Ok(BatchOutcome::classify(status, &final_url, text, &self.offline_path))
    }
}
