//! # Application State
//!
//! Shared state for the Axum application, plus the startup configuration
//! and the wiring that turns it into a running relay.

use relay_core::{
    intake_queue, BoxedSortedStore, CancellationToken, Dispatcher, DispatcherConfig,
    FallbackPolicy, HealthMonitor, HealthMonitorConfig, IntakeQueue, Ledger, PaymentRequest,
    ProbeFailurePolicy, Processors, RelayError, RelayResult, WorkerPool,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Runtime tuning, read from `config/relay.toml` when present
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Tuning {
    /// Number of settlement workers
    pub workers: usize,
    /// Validity window of a cached health result
    pub health_ttl_secs: u64,
    /// Deadline for one health probe
    pub probe_timeout_ms: u64,
    /// Deadline for one payment call
    pub payment_timeout_ms: u64,
    pub probe_failure_policy: ProbeFailurePolicy,
    pub fallback_policy: FallbackPolicy,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            workers: 4,
            health_ttl_secs: 5,
            probe_timeout_ms: 3_000,
            payment_timeout_ms: 3_000,
            probe_failure_policy: ProbeFailurePolicy::Pessimistic,
            fallback_policy: FallbackPolicy::SettleOnAttempt,
        }
    }
}

impl Tuning {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> RelayResult<Self> {
        let tuning: Tuning = toml::from_str(content)
            .map_err(|e| RelayError::Configuration(format!("invalid tuning file: {}", e)))?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load from `RELAY_CONFIG`, then the default locations, else defaults
    pub fn load() -> RelayResult<Self> {
        if let Ok(path) = std::env::var("RELAY_CONFIG") {
            let content = std::fs::read_to_string(&path).map_err(|e| {
                RelayError::Configuration(format!("cannot read RELAY_CONFIG {}: {}", path, e))
            })?;
            tracing::info!("Loaded tuning from {}", path);
            return Self::from_toml_str(&content);
        }

        let config_paths = ["config/relay.toml", "../config/relay.toml"];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    RelayError::Configuration(format!("cannot read {}: {}", path, e))
                })?;
                tracing::info!("Loaded tuning from {}", path);
                return Self::from_toml_str(&content);
            }
        }

        tracing::info!("No tuning file found, using defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> RelayResult<()> {
        if self.workers == 0 {
            return Err(RelayError::Configuration("workers must be at least 1".to_string()));
        }
        if self.health_ttl_secs == 0 || self.probe_timeout_ms == 0 || self.payment_timeout_ms == 0
        {
            return Err(RelayError::Configuration(
                "TTL and timeouts must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn payment_timeout(&self) -> Duration {
        Duration::from_millis(self.payment_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn health_config(&self) -> HealthMonitorConfig {
        HealthMonitorConfig {
            ttl: Duration::from_secs(self.health_ttl_secs),
            probe_timeout: self.probe_timeout(),
            probe_failure_policy: self.probe_failure_policy,
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            payment_timeout: self.payment_timeout(),
            fallback_policy: self.fallback_policy,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    pub tuning: Tuning,
}

impl AppConfig {
    /// Load from environment variables and the tuning file
    pub fn from_env() -> RelayResult<Self> {
        dotenvy::dotenv().ok();

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| RelayError::Configuration(format!("invalid PORT: {}", raw)))?,
            Err(_) => 8080,
        };

        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            tuning: Tuning::load()?,
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> RelayResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| RelayError::Configuration(format!("invalid bind address: {}", e)))
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Admission side of the intake queue
    pub queue: IntakeQueue<PaymentRequest>,
    /// Ledger for summaries
    pub ledger: Ledger,
    /// Application config
    pub config: AppConfig,
}

/// A wired relay: HTTP state plus the workers feeding on its queue
pub struct Relay {
    pub state: AppState,
    pub workers: WorkerPool,
}

impl Relay {
    /// Wire processors and store into a running relay.
    ///
    /// Health monitor and queue are created here once and shared by handle.
    pub fn assemble(
        config: AppConfig,
        processors: Processors,
        store: BoxedSortedStore,
        cancel: CancellationToken,
    ) -> Self {
        let tuning = &config.tuning;
        let health = Arc::new(HealthMonitor::new(
            processors.iter().cloned(),
            tuning.health_config(),
        ));
        let ledger = Ledger::new(store);
        let dispatcher = Arc::new(Dispatcher::new(
            processors,
            health,
            ledger.clone(),
            tuning.dispatcher_config(),
        ));

        let (queue, receiver) = intake_queue();
        let workers = WorkerPool::spawn(tuning.workers, receiver, dispatcher, cancel);

        Self {
            state: AppState {
                queue,
                ledger,
                config,
            },
            workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuning_defaults() {
        let tuning = Tuning::from_toml_str("").unwrap();
        assert_eq!(tuning, Tuning::default());
        assert_eq!(tuning.health_config().ttl, Duration::from_secs(5));
        assert_eq!(tuning.health_config().probe_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_tuning_file() {
        let tuning = Tuning::from_toml_str(
            r#"
            workers = 16
            payment_timeout_ms = 1500
            probe_failure_policy = "optimistic"
            fallback_policy = "settle_on_success"
            "#,
        )
        .unwrap();

        assert_eq!(tuning.workers, 16);
        assert_eq!(tuning.health_ttl_secs, 5);
        assert_eq!(tuning.dispatcher_config().payment_timeout, Duration::from_millis(1500));
        assert_eq!(
            tuning.dispatcher_config().fallback_policy,
            FallbackPolicy::SettleOnSuccess
        );
        assert_eq!(
            tuning.health_config().probe_failure_policy,
            ProbeFailurePolicy::Optimistic
        );
    }

    #[test]
    fn test_tuning_rejects_bad_values() {
        assert!(Tuning::from_toml_str("workers = 0").is_err());
        assert!(Tuning::from_toml_str("payment_timeout_ms = 0").is_err());
        assert!(Tuning::from_toml_str("fallback_policy = \"sometimes\"").is_err());
        assert!(Tuning::from_toml_str("retries = 3").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            host: "0.0.0.0".to_string(),
            port: 9999,
            tuning: Tuning::default(),
        };
        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:9999");

        let config = AppConfig {
            host: "not a host".to_string(),
            ..config
        };
        assert!(config.socket_addr().is_err());
    }
}
