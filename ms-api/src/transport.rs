//! Batch transport seam and outcome classification.

use async_trait::async_trait;

use ms_core::constants::status;
use ms_core::error::{MsError, MsResult};
use ms_models::SnapPayload;

/// Result of posting one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The server accepted the batch. `message` is the response body.
    Success { message: String },
    /// The server answered with a non-success status.
    ServerError { status: u16, message: String },
    /// The endpoint could not be reached.
    Unreachable { message: String },
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Success { .. })
    }

    /// Human-readable message carried by the outcome.
    pub fn message(&self) -> &str {
        match self {
            BatchOutcome::Success { message }
            | BatchOutcome::ServerError { message, .. }
            | BatchOutcome::Unreachable { message } => message,
        }
    }

    /// Classify a completed HTTP exchange.
    ///
    /// A response served from the offline page counts as unreachable no
    /// matter its status, since it means the request never left the device.
    pub fn classify(status_code: u16, final_url: &str, body: String, offline_path: &str) -> Self {
        if is_offline_page(final_url, offline_path) {
            return BatchOutcome::Unreachable {
                message: status::UNREACHABLE.to_string(),
            };
        }

        if (200..300).contains(&status_code) {
            BatchOutcome::Success { message: body }
        } else {
            BatchOutcome::ServerError {
                status: status_code,
                message: body,
            }
        }
    }

    /// Classify a request that never produced a response.
    pub fn from_transport_error(err: &MsError) -> Self {
        match err {
            MsError::ServerError { status, message } => BatchOutcome::ServerError {
                status: *status,
                message: message.clone(),
            },
            _ => BatchOutcome::Unreachable {
                message: status::UNREACHABLE.to_string(),
            },
        }
    }
}

fn is_offline_page(final_url: &str, offline_path: &str) -> bool {
    let offline_path = offline_path.trim_matches('/');
    if offline_path.is_empty() {
        return false;
    }
    let path = final_url.split(['?', '#']).next().unwrap_or(final_url);
    path.contains(offline_path)
}

/// Something that can deliver a batch of snaps to the sync endpoint.
///
/// `Err` is reserved for failures before anything was sent, such as a batch
/// that cannot be serialized. Network and server failures are outcomes.
#[async_trait]
pub trait BatchTransport: Send + Sync {
    async fn post_batch(&self, mail_to: &str, batch: &[SnapPayload]) -> MsResult<BatchOutcome>;
}
