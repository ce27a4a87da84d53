//! # relay-core
//!
//! Core routing engine for the payment relay.
//!
//! This crate provides:
//! - `PaymentProcessor` trait for the default/fallback processors
//! - `HealthMonitor` with TTL caching and single-flight refresh
//! - `Dispatcher` implementing the default → fallback decision procedure
//! - `IntakeQueue` and `WorkerPool` decoupling admission from settlement
//! - `Ledger` over an opaque `SortedStore`, and `PaymentSummary` reporting
//! - `RelayError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use relay_core::*;
//!
//! let processors = Processors::new(default, fallback)?;
//! let health = Arc::new(HealthMonitor::new(processors.iter().cloned(), HealthMonitorConfig::default()));
//! let ledger = Ledger::new(Arc::new(InMemorySortedStore::new()));
//! let dispatcher = Arc::new(Dispatcher::new(processors, health, ledger, DispatcherConfig::default()));
//!
//! let (queue, receiver) = intake_queue();
//! let pool = WorkerPool::spawn(4, receiver, dispatcher, CancellationToken::new());
//!
//! queue.enqueue(PaymentRequest::new(correlation_id, amount)?)?;
//! ```

pub mod dispatcher;
pub mod error;
pub mod health;
pub mod ledger;
pub mod payment;
pub mod processor;
pub mod queue;
pub mod summary;
pub mod worker;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use dispatcher::{Dispatcher, DispatcherConfig, FallbackPolicy, Settlement};
pub use error::{RelayError, RelayResult};
pub use health::{HealthMonitor, HealthMonitorConfig, HealthState, ProbeFailurePolicy};
pub use ledger::{
    BoxedSortedStore, InMemorySortedStore, Ledger, LedgerEntry, SortedStore, LEDGER_KEY,
};
pub use payment::{PaymentRequest, ProcessorPayment};
pub use processor::{
    BoxedPaymentProcessor, PaymentProcessor, ProcessorKind, Processors, ServiceHealth,
};
pub use queue::{intake_queue, IntakeQueue, IntakeReceiver};
pub use summary::{PaymentSummary, ProcessorTotals};
pub use worker::WorkerPool;
pub use tokio_util::sync::CancellationToken;
