//! # Relay Error Types
//!
//! Typed error handling for the payment relay.
//! All fallible relay operations return `Result<T, RelayError>`.

use thiserror::Error;

/// Core error type for all relay operations
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration errors (missing URLs, unreachable store at startup)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data (non-positive amount, missing correlation id)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Processor answered with a non-success status
    #[error("Upstream error [{processor}]: {message}")]
    Upstream { processor: String, message: String },

    /// Network/HTTP error communicating with a processor
    #[error("Network error: {0}")]
    Network(String),

    /// An outbound call exceeded its deadline
    #[error("Timed out after {after_ms}ms: {operation}")]
    Timeout { operation: String, after_ms: u64 },

    /// Intake queue has no consumers left
    #[error("Intake queue is closed")]
    QueueClosed,

    /// Ledger store I/O failure
    #[error("Store error: {0}")]
    Store(String),

    /// A stored ledger record could not be decoded
    #[error("Malformed ledger record: {0}")]
    MalformedRecord(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RelayError {
    /// Returns true for upstream failures that trigger the fallback handoff
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RelayError::Upstream { .. } | RelayError::Network(_) | RelayError::Timeout { .. }
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            RelayError::Configuration(_) => 500,
            RelayError::InvalidRequest(_) => 400,
            RelayError::Upstream { .. } => 502,
            RelayError::Network(_) => 503,
            RelayError::Timeout { .. } => 504,
            RelayError::QueueClosed => 503,
            RelayError::Store(_) => 503,
            RelayError::MalformedRecord(_) => 500,
            RelayError::Serialization(_) => 500,
        }
    }
}

/// Result type alias for relay operations
pub type RelayResult<T> = Result<T, RelayError>;
