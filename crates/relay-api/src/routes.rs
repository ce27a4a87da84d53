//! # Routes
//!
//! Axum router configuration for the relay API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the main application router
///
/// Routes:
///   - POST /payments - Admit a payment (202, settled asynchronously)
///   - GET  /payments-summary?from=&to= - Per-processor totals
///   - GET  /health - Liveness and queue depth
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/payments", post(handlers::submit_payment))
        .route("/payments-summary", get(handlers::payments_summary))
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
