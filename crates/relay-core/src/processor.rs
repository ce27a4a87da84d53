//! # Payment Processor Trait
//!
//! Seam between the relay and the external payment processors.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 PaymentProcessor (trait)                    │
//! │  ├── submit()          POST {base}/payments                 │
//! │  ├── service_health()  GET  {base}/payments/service-health  │
//! │  └── kind()                                                 │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                  ┌─────────┴─────────┐
//!          ┌───────┴───────┐   ┌───────┴───────┐
//!          │ HttpProcessor │   │ HttpProcessor │
//!          │   (default)   │   │  (fallback)   │
//!          └───────────────┘   └───────────────┘
//! ```

use crate::error::{RelayError, RelayResult};
use crate::payment::ProcessorPayment;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifies one of the two processors. Also the ledger tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorKind {
    Default,
    Fallback,
}

impl ProcessorKind {
    pub const ALL: [ProcessorKind; 2] = [ProcessorKind::Default, ProcessorKind::Fallback];

    /// Tag used in logs, ledger entries and the summary
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorKind::Default => "default",
            ProcessorKind::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `GET {base}/payments/service-health`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    pub failing: bool,
    /// Latency hint in milliseconds, when the processor reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_response_time: Option<u64>,
}

/// An external payment processor.
///
/// Implementations return `Ok(())` only for an HTTP 2xx answer. Every other
/// outcome is an error; the dispatcher decides what it means.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Submit a payment. Must be bounded by a timeout.
    async fn submit(&self, payment: &ProcessorPayment) -> RelayResult<()>;

    /// Fetch the processor's self-reported health.
    ///
    /// Non-success statuses and unreadable bodies are errors.
    async fn service_health(&self) -> RelayResult<ServiceHealth>;

    /// Which processor this is.
    fn kind(&self) -> ProcessorKind;
}

/// Type alias for a shared processor (dynamic dispatch)
pub type BoxedPaymentProcessor = Arc<dyn PaymentProcessor>;

/// The default/fallback pair the relay routes between
#[derive(Clone)]
pub struct Processors {
    default: BoxedPaymentProcessor,
    fallback: BoxedPaymentProcessor,
}

impl Processors {
    /// Pair two processors, checking each sits in the right slot
    pub fn new(default: BoxedPaymentProcessor, fallback: BoxedPaymentProcessor) -> RelayResult<Self> {
        if default.kind() != ProcessorKind::Default {
            return Err(RelayError::Configuration(format!(
                "default slot holds the {} processor",
                default.kind()
            )));
        }
        if fallback.kind() != ProcessorKind::Fallback {
            return Err(RelayError::Configuration(format!(
                "fallback slot holds the {} processor",
                fallback.kind()
            )));
        }
        Ok(Self { default, fallback })
    }

    /// Get a processor by kind
    pub fn get(&self, kind: ProcessorKind) -> &BoxedPaymentProcessor {
        match kind {
            ProcessorKind::Default => &self.default,
            ProcessorKind::Fallback => &self.fallback,
        }
    }

    /// Iterate both processors, default first
    pub fn iter(&self) -> impl Iterator<Item = &BoxedPaymentProcessor> {
        [&self.default, &self.fallback].into_iter()
    }
}
