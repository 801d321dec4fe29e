//! HTTP callback observer
//!
//! POSTs the event envelope to a configured endpoint, grounded on
//! `everruns-observability`'s Langfuse client (`langfuse.rs`) for the
//! bounded-timeout `reqwest::Client` pattern. Per §9, this observer has a
//! bounded timeout and no unbounded retry: one attempt, logged on failure,
//! never propagated (§7 `ObserverError`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::warn;

use super::bus::Observer;
use super::event::ObserverEvent;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts every lifecycle event's wire envelope to an HTTP endpoint.
pub struct HttpCallbackObserver {
    client: Client,
    endpoint: String,
}

impl HttpCallbackObserver {
    /// Builds an observer posting to `endpoint`, bounded by `timeout`
    /// (falls back to [`DEFAULT_TIMEOUT`] if construction of the client
    /// fails, which only happens on a malformed TLS configuration).
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, endpoint: endpoint.into() }
    }

    pub fn with_default_timeout(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint, DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl Observer for HttpCallbackObserver {
    fn name(&self) -> &str {
        "http_callback"
    }

    async fn on_event(&self, event: &ObserverEvent) {
        let envelope = event.envelope();
        let result = self.client.post(&self.endpoint).json(&envelope).send().await;
        match result {
            Ok(response) if !response.status().is_success() => {
                warn!(
                    endpoint = %self.endpoint,
                    status = %response.status(),
                    "callback observer received non-success status"
                );
            }
            Err(err) => {
                warn!(endpoint = %self.endpoint, error = %err, "callback observer request failed");
            }
            Ok(_) => {}
        }
    }
}
