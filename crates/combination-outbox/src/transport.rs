//! Delivery transport for combination submissions.

use crate::Combination;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Request timeout for a single delivery attempt.
///
/// A hung request surfaces as a failure and is retried like any other,
/// instead of stalling the publisher in-flight forever.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport error type.
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("server rejected combination: HTTP {0}")]
    Rejected(StatusCode),
}

/// Result type alias using TransportError.
pub type TransportResult<T> = Result<T, TransportError>;

/// Asynchronous delivery of one combination to the remote API.
///
/// The publisher serializes attempts, so implementations never see more
/// than one `send` in flight per queue.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one combination. Any error is treated as a failed attempt.
    async fn send(&self, combination: &Combination) -> TransportResult<()>;
}

/// HTTP transport POSTing JSON records to the submit-combination endpoint.
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    /// Create a transport for the given submit endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, combination: &Combination) -> TransportResult<()> {
        debug!(
            endpoint = %self.endpoint,
            user_id = %combination.user_id,
            "Sending combination"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(combination)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Rejected(status));
        }

        // The response body is not needed; a 2xx status is the confirmation.
        Ok(())
    }
}
