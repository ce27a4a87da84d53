//! # Health Monitor
//!
//! Cached per-processor health with a TTL and single-flight refresh.
//!
//! A read inside the TTL window never touches the network. Once the cached
//! value is stale, callers queue on the key's refresh lock; the first one
//! probes, the rest re-check after acquiring the lock and observe its result.
//! At most one probe per processor is in flight at any time.

use crate::processor::{BoxedPaymentProcessor, ProcessorKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Default validity window of a cached health result
pub const DEFAULT_HEALTH_TTL: Duration = Duration::from_secs(5);

/// Default deadline for one health probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// How an indeterminate probe (timeout, network error, non-2xx) is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeFailurePolicy {
    /// Indeterminate means unhealthy
    #[default]
    Pessimistic,
    /// Indeterminate keeps the last known value, healthy if there is none
    Optimistic,
}

impl ProbeFailurePolicy {
    pub fn resolve(&self, last_known: Option<bool>) -> bool {
        match self {
            ProbeFailurePolicy::Pessimistic => false,
            ProbeFailurePolicy::Optimistic => last_known.unwrap_or(true),
        }
    }
}

/// Last probe result for one processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthState {
    pub healthy: bool,
    pub last_checked: Instant,
}

impl HealthState {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.last_checked.elapsed() < ttl
    }
}

/// Health monitor tuning
#[derive(Debug, Clone, Copy)]
pub struct HealthMonitorConfig {
    pub ttl: Duration,
    pub probe_timeout: Duration,
    pub probe_failure_policy: ProbeFailurePolicy,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_HEALTH_TTL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            probe_failure_policy: ProbeFailurePolicy::default(),
        }
    }
}

struct HealthSlot {
    processor: BoxedPaymentProcessor,
    state: RwLock<Option<HealthState>>,
    refresh: Mutex<()>,
}

impl HealthSlot {
    async fn fresh_value(&self, ttl: Duration) -> Option<bool> {
        self.state
            .read()
            .await
            .filter(|state| state.is_fresh(ttl))
            .map(|state| state.healthy)
    }
}

/// Cached health of the registered processors
pub struct HealthMonitor {
    slots: HashMap<ProcessorKind, HealthSlot>,
    config: HealthMonitorConfig,
}

impl HealthMonitor {
    /// Track the given processors. State is empty until the first query.
    pub fn new(
        processors: impl IntoIterator<Item = BoxedPaymentProcessor>,
        config: HealthMonitorConfig,
    ) -> Self {
        let slots = processors
            .into_iter()
            .map(|processor| {
                (
                    processor.kind(),
                    HealthSlot {
                        processor,
                        state: RwLock::new(None),
                        refresh: Mutex::new(()),
                    },
                )
            })
            .collect();

        Self { slots, config }
    }

    /// Whether the processor is currently considered healthy.
    ///
    /// Processors that were never registered are unhealthy.
    pub async fn is_healthy(&self, kind: ProcessorKind) -> bool {
        let Some(slot) = self.slots.get(&kind) else {
            warn!(processor = %kind, "Health queried for unregistered processor");
            return false;
        };

        if let Some(healthy) = slot.fresh_value(self.config.ttl).await {
            return healthy;
        }

        let _refresh = slot.refresh.lock().await;

        // Another caller may have refreshed while we waited
        if let Some(healthy) = slot.fresh_value(self.config.ttl).await {
            return healthy;
        }

        let last_known = slot.state.read().await.map(|state| state.healthy);
        let healthy = self.probe(kind, slot, last_known).await;

        *slot.state.write().await = Some(HealthState {
            healthy,
            last_checked: Instant::now(),
        });

        healthy
    }

    /// Cached state without refreshing
    pub async fn snapshot(&self, kind: ProcessorKind) -> Option<HealthState> {
        match self.slots.get(&kind) {
            Some(slot) => *slot.state.read().await,
            None => None,
        }
    }

    #[instrument(name = "health_probe", skip(self, slot, last_known), fields(processor = %kind))]
    async fn probe(&self, kind: ProcessorKind, slot: &HealthSlot, last_known: Option<bool>) -> bool {
        let policy = self.config.probe_failure_policy;

        match tokio::time::timeout(self.config.probe_timeout, slot.processor.service_health()).await
        {
            Ok(Ok(report)) => {
                let healthy = !report.failing;
                if last_known != Some(healthy) {
                    info!(
                        healthy,
                        min_response_time = ?report.min_response_time,
                        "Processor health changed"
                    );
                } else {
                    debug!(healthy, min_response_time = ?report.min_response_time, "Processor health refreshed");
                }
                healthy
            }
            Ok(Err(e)) => {
                let healthy = policy.resolve(last_known);
                warn!(error = %e, ?policy, healthy, "Health probe failed");
                healthy
            }
            Err(_) => {
                let healthy = policy.resolve(last_known);
                warn!(
                    timeout_ms = self.config.probe_timeout.as_millis() as u64,
                    ?policy,
                    healthy,
                    "Health probe timed out"
                );
                healthy
            }
        }
    }
}
