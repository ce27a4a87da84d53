//! Scriptable processors and stores shared by the unit tests.

use crate::error::{RelayError, RelayResult};
use crate::ledger::SortedStore;
use crate::payment::ProcessorPayment;
use crate::processor::{PaymentProcessor, ProcessorKind, ServiceHealth};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Processor whose answers are flipped by the test
pub(crate) struct ScriptedProcessor {
    kind: ProcessorKind,
    failing: AtomicBool,
    health_error: AtomicBool,
    submit_ok: AtomicBool,
    submit_rejected: AtomicBool,
    probe_delay_ms: AtomicU64,
    submit_delay_ms: AtomicU64,
    probes: AtomicUsize,
    submits: AtomicUsize,
    submitted: Mutex<Vec<ProcessorPayment>>,
}

impl ScriptedProcessor {
    fn build(kind: ProcessorKind, failing: bool) -> Arc<Self> {
        Arc::new(Self {
            kind,
            failing: AtomicBool::new(failing),
            health_error: AtomicBool::new(false),
            submit_ok: AtomicBool::new(true),
            submit_rejected: AtomicBool::new(false),
            probe_delay_ms: AtomicU64::new(0),
            submit_delay_ms: AtomicU64::new(0),
            probes: AtomicUsize::new(0),
            submits: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn healthy(kind: ProcessorKind) -> Arc<Self> {
        Self::build(kind, false)
    }

    pub(crate) fn failing(kind: ProcessorKind) -> Arc<Self> {
        Self::build(kind, true)
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn set_health_error(&self, errored: bool) {
        self.health_error.store(errored, Ordering::SeqCst);
    }

    pub(crate) fn set_submit_ok(&self, ok: bool) {
        self.submit_ok.store(ok, Ordering::SeqCst);
    }

    /// Fail submits with a non-transient error
    pub(crate) fn set_submit_rejected(&self, rejected: bool) {
        self.submit_rejected.store(rejected, Ordering::SeqCst);
    }

    pub(crate) fn set_probe_delay(&self, delay: Duration) {
        self.probe_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub(crate) fn set_submit_delay(&self, delay: Duration) {
        self.submit_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub(crate) fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub(crate) fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub(crate) fn submitted(&self) -> Vec<ProcessorPayment> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProcessor for ScriptedProcessor {
    async fn submit(&self, payment: &ProcessorPayment) -> RelayResult<()> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(payment.clone());

        let delay = self.submit_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.submit_rejected.load(Ordering::SeqCst) {
            return Err(RelayError::Serialization("payload rejected".to_string()));
        }

        if self.submit_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RelayError::Upstream {
                processor: self.kind.to_string(),
                message: "HTTP 500 Internal Server Error".to_string(),
            })
        }
    }

    async fn service_health(&self) -> RelayResult<ServiceHealth> {
        self.probes.fetch_add(1, Ordering::SeqCst);

        let delay = self.probe_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.health_error.load(Ordering::SeqCst) {
            return Err(RelayError::Network("connection refused".to_string()));
        }

        Ok(ServiceHealth {
            failing: self.failing.load(Ordering::SeqCst),
            min_response_time: Some(10),
        })
    }

    fn kind(&self) -> ProcessorKind {
        self.kind
    }
}

/// Store that rejects every operation
pub(crate) struct UnavailableStore;

#[async_trait]
impl SortedStore for UnavailableStore {
    async fn add(&self, _score: i64, _member: String) -> RelayResult<()> {
        Err(RelayError::Store("store unavailable".to_string()))
    }

    async fn range_by_score(&self, _min: i64, _max: i64) -> RelayResult<Vec<String>> {
        Err(RelayError::Store("store unavailable".to_string()))
    }
}
