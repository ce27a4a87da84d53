//! # Payment Types
//!
//! Admitted payment requests and the payload sent to processors.

use crate::error::{RelayError, RelayResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A payment admitted for settlement.
///
/// Created per inbound call, consumed by the dispatcher, then dropped.
/// Duplicate correlation ids are accepted and processed independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Caller-supplied identifier
    pub correlation_id: Uuid,

    /// Amount to settle, always positive
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

impl PaymentRequest {
    /// Create a validated payment request
    pub fn new(correlation_id: Uuid, amount: Decimal) -> RelayResult<Self> {
        let request = Self {
            correlation_id,
            amount,
        };
        request.validate()?;
        Ok(request)
    }

    /// Build from optional fields, as they arrive from an inbound body
    pub fn from_parts(correlation_id: Option<Uuid>, amount: Option<Decimal>) -> RelayResult<Self> {
        let correlation_id = correlation_id
            .ok_or_else(|| RelayError::InvalidRequest("correlationId is required".to_string()))?;
        let amount =
            amount.ok_or_else(|| RelayError::InvalidRequest("amount is required".to_string()))?;
        Self::new(correlation_id, amount)
    }

    /// Check the amount invariant
    pub fn validate(&self) -> RelayResult<()> {
        if self.amount <= Decimal::ZERO {
            return Err(RelayError::InvalidRequest(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }
        Ok(())
    }

    /// Stamp the request for an outbound processor call
    pub fn stamp(&self, requested_at: DateTime<Utc>) -> ProcessorPayment {
        ProcessorPayment {
            correlation_id: self.correlation_id,
            amount: self.amount,
            requested_at,
        }
    }
}

/// Body of `POST {base}/payments`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorPayment {
    pub correlation_id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub requested_at: DateTime<Utc>,
}
