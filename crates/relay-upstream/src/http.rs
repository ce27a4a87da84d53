//! # HTTP Processor
//!
//! reqwest implementation of `PaymentProcessor`.
//!
//! - `POST {base}/payments` with `{correlationId, amount, requestedAt}`
//! - `GET {base}/payments/service-health` returning `{failing, minResponseTime}`
//!
//! Both calls are bounded: payments by the client-wide timeout, probes by a
//! per-request timeout.

use async_trait::async_trait;
use relay_core::{
    PaymentProcessor, ProcessorKind, ProcessorPayment, RelayError, RelayResult, ServiceHealth,
};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Processor reached over HTTP
pub struct HttpProcessor {
    kind: ProcessorKind,
    base_url: String,
    client: Client,
    payment_timeout: Duration,
    probe_timeout: Duration,
}

impl HttpProcessor {
    /// Create a processor client
    pub fn new(
        kind: ProcessorKind,
        base_url: impl Into<String>,
        payment_timeout: Duration,
        probe_timeout: Duration,
    ) -> RelayResult<Self> {
        let client = Client::builder()
            .timeout(payment_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| RelayError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            kind,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            payment_timeout,
            probe_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn transport_error(&self, operation: &str, deadline: Duration, e: reqwest::Error) -> RelayError {
        if e.is_timeout() {
            RelayError::Timeout {
                operation: format!("{} {}", operation, self.kind),
                after_ms: deadline.as_millis() as u64,
            }
        } else {
            RelayError::Network(format!("{} {}: {}", operation, self.kind, e))
        }
    }
}

#[async_trait]
impl PaymentProcessor for HttpProcessor {
    #[instrument(skip(self, payment), fields(processor = %self.kind, correlation_id = %payment.correlation_id))]
    async fn submit(&self, payment: &ProcessorPayment) -> RelayResult<()> {
        let url = format!("{}/payments", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(payment)
            .send()
            .await
            .map_err(|e| self.transport_error("POST /payments", self.payment_timeout, e))?;

        let status = response.status();
        if status.is_success() {
            debug!(%status, "Processor accepted payment");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!(%status, body = %body, "Processor rejected payment");
        Err(RelayError::Upstream {
            processor: self.kind.to_string(),
            message: format!("HTTP {}: {}", status, body),
        })
    }

    #[instrument(skip(self), fields(processor = %self.kind))]
    async fn service_health(&self) -> RelayResult<ServiceHealth> {
        let url = format!("{}/payments/service-health", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| self.transport_error("GET /payments/service-health", self.probe_timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Upstream {
                processor: self.kind.to_string(),
                message: format!("health check returned HTTP {}", status),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error("GET /payments/service-health", self.probe_timeout, e))?;

        serde_json::from_str(&body).map_err(|e| {
            RelayError::Serialization(format!("Failed to parse {} health response: {}", self.kind, e))
        })
    }

    fn kind(&self) -> ProcessorKind {
        self.kind
    }
}
