//! # relay-api
//!
//! HTTP API layer for payment-relay.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Asynchronous payment admission onto the intake queue
//! - Ledger summaries per processor
//! - Startup wiring of processors, health monitor, dispatcher and workers
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/payments` | Admit a payment |
//! | GET | `/payments-summary` | Totals per processor for a window |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState, Relay, Tuning};
