//! # relay-upstream
//!
//! Concrete collaborators for the payment relay.
//!
//! 1. **HttpProcessor** - reqwest client for a payment processor
//!    - `POST {base}/payments`
//!    - `GET {base}/payments/service-health`
//!
//! 2. **RedisSortedStore** - the ledger's sorted set
//!    - `ZADD` on settlement
//!    - `ZRANGEBYSCORE` for summaries
//!
//! 3. **UpstreamConfig** - processor and Redis endpoints from the environment
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use relay_upstream::{HttpProcessor, RedisSortedStore, UpstreamConfig};
//!
//! let config = UpstreamConfig::from_env()?;
//! let default = HttpProcessor::new(
//!     ProcessorKind::Default,
//!     config.processor_url(ProcessorKind::Default),
//!     payment_timeout,
//!     probe_timeout,
//! )?;
//! let store = RedisSortedStore::connect(&config.redis_url).await?;
//! ```

pub mod config;
pub mod http;
pub mod redis_store;

// Re-exports
pub use config::UpstreamConfig;
pub use http::HttpProcessor;
pub use redis_store::RedisSortedStore;
