//! # Request Handlers
//!
//! Axum request handlers for the relay API.
//! Payments are admitted asynchronously: a 202 means queued, not settled.

use crate::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use relay_core::{PaymentRequest, PaymentSummary, RelayError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};
use uuid::Uuid;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Submit payment request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPaymentRequest {
    #[serde(default)]
    pub correlation_id: Option<Uuid>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub amount: Option<Decimal>,
}

/// Submit payment response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAcceptedResponse {
    pub message: String,
    pub correlation_id: Uuid,
}

/// Summary window; missing bounds are open-ended
#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn relay_error_to_response(err: RelayError) -> ApiError {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

fn bad_request(error: &str, details: String) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(error, 400).with_details(details)),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "payment-relay",
        "version": env!("CARGO_PKG_VERSION"),
        "queueDepth": state.queue.depth()
    }))
}

/// Admit a payment for asynchronous settlement
#[instrument(skip(state, payload))]
pub async fn submit_payment(
    State(state): State<AppState>,
    payload: Result<Json<SubmitPaymentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PaymentAcceptedResponse>), ApiError> {
    let Json(body) = payload.map_err(|e| bad_request("Invalid payment body", e.body_text()))?;

    let request = PaymentRequest::from_parts(body.correlation_id, body.amount)
        .map_err(relay_error_to_response)?;
    let correlation_id = request.correlation_id;

    state.queue.enqueue(request).map_err(|e| {
        error!(%correlation_id, "Failed to enqueue payment: {}", e);
        relay_error_to_response(e)
    })?;

    debug!(%correlation_id, depth = state.queue.depth(), "Payment queued");

    Ok((
        StatusCode::ACCEPTED,
        Json(PaymentAcceptedResponse {
            message: "payment accepted for processing".to_string(),
            correlation_id,
        }),
    ))
}

/// Per-processor totals over a time window
#[instrument(skip(state, query))]
pub async fn payments_summary(
    State(state): State<AppState>,
    query: Result<Query<SummaryQuery>, QueryRejection>,
) -> Result<Json<PaymentSummary>, ApiError> {
    let Query(window) = query.map_err(|e| bad_request("Invalid summary window", e.body_text()))?;

    let from = window.from.unwrap_or(DateTime::<Utc>::MIN_UTC);
    let to = window.to.unwrap_or(DateTime::<Utc>::MAX_UTC);

    let summary = state.ledger.summary(from, to).await.map_err(|e| {
        error!("Failed to read ledger: {}", e);
        relay_error_to_response(e)
    })?;

    Ok(Json(summary))
}
