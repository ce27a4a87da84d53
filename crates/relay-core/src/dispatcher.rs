//! # Dispatcher
//!
//! Routes one payment to a processor and records the settlement.
//!
//! ```text
//! default healthy? ──yes──▶ POST default ──ok──▶ ledger "default"
//!        │                       │
//!        no                transient failure
//!        │                       ▼
//!        │                 POST fallback (once, health ignored)
//!        │                       │
//!        │              FallbackPolicy decides whether to record "fallback"
//!        ▼
//! fallback healthy? ──yes──▶ POST fallback ──ok──▶ ledger "fallback"
//!        │                       │
//!        no                    failed
//!        └──────────┬────────────┘
//!                   ▼
//!               unresolved
//! ```

use crate::error::{RelayError, RelayResult};
use crate::health::HealthMonitor;
use crate::ledger::Ledger;
use crate::payment::{PaymentRequest, ProcessorPayment};
use crate::processor::{ProcessorKind, Processors};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Default deadline for one payment call
pub const DEFAULT_PAYMENT_TIMEOUT: Duration = Duration::from_secs(3);

/// What to record when the fallback is tried after a default failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Record "fallback" once the attempt was made, whatever its outcome
    #[default]
    SettleOnAttempt,
    /// Record "fallback" only when the fallback call succeeds
    SettleOnSuccess,
}

/// Outcome of one dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// A ledger entry was written under this processor's tag
    Settled(ProcessorKind),
    /// Nothing was recorded
    Unresolved,
}

impl Settlement {
    pub fn is_settled(&self) -> bool {
        matches!(self, Settlement::Settled(_))
    }
}

/// Dispatcher tuning
#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    pub payment_timeout: Duration,
    pub fallback_policy: FallbackPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            payment_timeout: DEFAULT_PAYMENT_TIMEOUT,
            fallback_policy: FallbackPolicy::default(),
        }
    }
}

/// Routes payments between the default and fallback processors
pub struct Dispatcher {
    processors: Processors,
    health: Arc<HealthMonitor>,
    ledger: Ledger,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(
        processors: Processors,
        health: Arc<HealthMonitor>,
        ledger: Ledger,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            processors,
            health,
            ledger,
            config,
        }
    }

    /// Settle one payment.
    ///
    /// Upstream failures never surface as errors; they only decide the
    /// route. Only transient failures of the default hand off to the
    /// fallback. Errors are reserved for invalid input and ledger failures.
    #[instrument(
        name = "dispatcher_settle",
        skip(self, request),
        fields(correlation_id = %request.correlation_id, amount = %request.amount)
    )]
    pub async fn settle(&self, request: &PaymentRequest) -> RelayResult<Settlement> {
        request.validate()?;
        let payment = request.stamp(Utc::now());

        if self.health.is_healthy(ProcessorKind::Default).await {
            match self.call(ProcessorKind::Default, &payment).await {
                Ok(()) => return self.record(ProcessorKind::Default, request).await,
                Err(e) if e.is_transient() => {
                    warn!(error = %e, "Default processor failed, handing off to fallback");
                    return self.hand_off(request, &payment).await;
                }
                Err(e) => {
                    error!(error = %e, "Default processor rejected payment, not retrying");
                    return Ok(Settlement::Unresolved);
                }
            }
        }

        debug!("Default processor unhealthy, checking fallback");
        if !self.health.is_healthy(ProcessorKind::Fallback).await {
            warn!("Both processors unhealthy, payment unresolved");
            return Ok(Settlement::Unresolved);
        }

        match self.call(ProcessorKind::Fallback, &payment).await {
            Ok(()) => self.record(ProcessorKind::Fallback, request).await,
            Err(e) => {
                error!(error = %e, "Fallback processor failed, payment unresolved");
                Ok(Settlement::Unresolved)
            }
        }
    }

    /// Single fallback attempt after a default failure
    async fn hand_off(
        &self,
        request: &PaymentRequest,
        payment: &ProcessorPayment,
    ) -> RelayResult<Settlement> {
        let outcome = self.call(ProcessorKind::Fallback, payment).await;

        match (outcome, self.config.fallback_policy) {
            (Ok(()), _) => self.record(ProcessorKind::Fallback, request).await,
            (Err(e), FallbackPolicy::SettleOnAttempt) => {
                error!(error = %e, "Fallback processor also failed, recording attempt");
                self.record(ProcessorKind::Fallback, request).await
            }
            (Err(e), FallbackPolicy::SettleOnSuccess) => {
                error!(error = %e, "Fallback processor also failed, payment unresolved");
                Ok(Settlement::Unresolved)
            }
        }
    }

    async fn call(&self, kind: ProcessorKind, payment: &ProcessorPayment) -> RelayResult<()> {
        let processor = self.processors.get(kind);
        let deadline = self.config.payment_timeout;

        match tokio::time::timeout(deadline, processor.submit(payment)).await {
            Ok(result) => result,
            Err(_) => Err(RelayError::Timeout {
                operation: format!("POST {} /payments", kind),
                after_ms: deadline.as_millis() as u64,
            }),
        }
    }

    async fn record(&self, kind: ProcessorKind, request: &PaymentRequest) -> RelayResult<Settlement> {
        self.ledger
            .append(kind, request.correlation_id, request.amount)
            .await?;
        info!(processor = %kind, "Payment settled");
        Ok(Settlement::Settled(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthMonitorConfig;
    use crate::ledger::{InMemorySortedStore, LedgerEntry};
    use crate::processor::ProcessorKind::{Default as Primary, Fallback};
    use crate::test_support::{ScriptedProcessor, UnavailableStore};
    use chrono::Duration as ChronoDuration;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    struct Harness {
        default: Arc<ScriptedProcessor>,
        fallback: Arc<ScriptedProcessor>,
        ledger: Ledger,
        dispatcher: Dispatcher,
    }

    impl Harness {
        fn new(
            default: Arc<ScriptedProcessor>,
            fallback: Arc<ScriptedProcessor>,
            policy: FallbackPolicy,
        ) -> Self {
            let ledger = Ledger::new(Arc::new(InMemorySortedStore::new()));
            Self::with_ledger(default, fallback, policy, ledger)
        }

        fn with_ledger(
            default: Arc<ScriptedProcessor>,
            fallback: Arc<ScriptedProcessor>,
            policy: FallbackPolicy,
            ledger: Ledger,
        ) -> Self {
            let processors = Processors::new(default.clone(), fallback.clone()).unwrap();
            let health = Arc::new(HealthMonitor::new(
                processors.iter().cloned(),
                HealthMonitorConfig::default(),
            ));
            let dispatcher = Dispatcher::new(
                processors,
                health,
                ledger.clone(),
                DispatcherConfig {
                    fallback_policy: policy,
                    ..DispatcherConfig::default()
                },
            );
            Self {
                default,
                fallback,
                ledger,
                dispatcher,
            }
        }

        async fn entries(&self) -> Vec<LedgerEntry> {
            let now = Utc::now();
            self.ledger
                .range_query(now - ChronoDuration::minutes(5), now + ChronoDuration::minutes(5))
                .await
                .unwrap()
        }
    }

    fn request(amount: Decimal) -> PaymentRequest {
        PaymentRequest::new(Uuid::new_v4(), amount).unwrap()
    }

    #[tokio::test]
    async fn test_default_success_records_default() {
        let h = Harness::new(
            ScriptedProcessor::healthy(Primary),
            ScriptedProcessor::healthy(Fallback),
            FallbackPolicy::SettleOnAttempt,
        );
        let req = request(dec!(19.90));

        let outcome = h.dispatcher.settle(&req).await.unwrap();
        assert_eq!(outcome, Settlement::Settled(Primary));

        let entries = h.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].processor, "default");
        assert_eq!(entries[0].amount, dec!(19.90));
        assert_eq!(entries[0].correlation_id, req.correlation_id);
        assert_eq!(h.fallback.submit_count(), 0);

        let summary = h.ledger.summary(Utc::now() - ChronoDuration::minutes(1), Utc::now()).await.unwrap();
        assert_eq!(summary.for_kind(Primary).total_requests, 1);
        assert_eq!(summary.for_kind(Primary).total_amount, dec!(19.90));
        assert_eq!(summary.for_kind(Fallback).total_requests, 0);
        assert_eq!(summary.for_kind(Fallback).total_amount, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_outbound_payload_is_stamped() {
        let h = Harness::new(
            ScriptedProcessor::healthy(Primary),
            ScriptedProcessor::healthy(Fallback),
            FallbackPolicy::SettleOnAttempt,
        );
        let req = request(dec!(7.5));
        let before = Utc::now();

        h.dispatcher.settle(&req).await.unwrap();

        let sent = h.default.submitted();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].correlation_id, req.correlation_id);
        assert_eq!(sent[0].amount, dec!(7.5));
        assert!(sent[0].requested_at >= before);
    }

    #[tokio::test]
    async fn test_default_unhealthy_fallback_success() {
        let h = Harness::new(
            ScriptedProcessor::failing(Primary),
            ScriptedProcessor::healthy(Fallback),
            FallbackPolicy::SettleOnAttempt,
        );

        let outcome = h.dispatcher.settle(&request(dec!(5.00))).await.unwrap();
        assert_eq!(outcome, Settlement::Settled(Fallback));

        let entries = h.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].processor, "fallback");
        assert_eq!(entries[0].amount, dec!(5.00));
        assert_eq!(h.default.submit_count(), 0);

        let summary = h.ledger.summary(Utc::now() - ChronoDuration::minutes(1), Utc::now()).await.unwrap();
        assert_eq!(summary.for_kind(Fallback).total_requests, 1);
        assert_eq!(summary.for_kind(Fallback).total_amount, dec!(5.00));
        assert_eq!(summary.for_kind(Primary).total_requests, 0);
        assert_eq!(summary.for_kind(Primary).total_amount, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_both_unhealthy_is_unresolved() {
        let h = Harness::new(
            ScriptedProcessor::failing(Primary),
            ScriptedProcessor::failing(Fallback),
            FallbackPolicy::SettleOnAttempt,
        );

        let outcome = h.dispatcher.settle(&request(dec!(1))).await.unwrap();
        assert_eq!(outcome, Settlement::Unresolved);
        assert!(!outcome.is_settled());
        assert!(h.entries().await.is_empty());
        assert_eq!(h.default.submit_count(), 0);
        assert_eq!(h.fallback.submit_count(), 0);
    }

    #[tokio::test]
    async fn test_default_unhealthy_fallback_call_fails() {
        let fallback = ScriptedProcessor::healthy(Fallback);
        fallback.set_submit_ok(false);
        let h = Harness::new(
            ScriptedProcessor::failing(Primary),
            fallback,
            FallbackPolicy::SettleOnAttempt,
        );

        let outcome = h.dispatcher.settle(&request(dec!(1))).await.unwrap();
        assert_eq!(outcome, Settlement::Unresolved);
        assert!(h.entries().await.is_empty());
        assert_eq!(h.fallback.submit_count(), 1);
    }

    #[tokio::test]
    async fn test_default_failure_hands_off_even_to_unhealthy_fallback() {
        let default = ScriptedProcessor::healthy(Primary);
        default.set_submit_ok(false);
        let h = Harness::new(
            default,
            ScriptedProcessor::failing(Fallback),
            FallbackPolicy::SettleOnSuccess,
        );

        let outcome = h.dispatcher.settle(&request(dec!(3))).await.unwrap();
        assert_eq!(outcome, Settlement::Settled(Fallback));
        assert_eq!(h.fallback.submit_count(), 1);
        assert_eq!(h.fallback.probe_count(), 0);
    }

    #[tokio::test]
    async fn test_settle_on_attempt_records_failed_fallback() {
        let default = ScriptedProcessor::healthy(Primary);
        default.set_submit_ok(false);
        let fallback = ScriptedProcessor::healthy(Fallback);
        fallback.set_submit_ok(false);
        let h = Harness::new(default, fallback, FallbackPolicy::SettleOnAttempt);

        let outcome = h.dispatcher.settle(&request(dec!(12.34))).await.unwrap();
        assert_eq!(outcome, Settlement::Settled(Fallback));

        let entries = h.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].processor, "fallback");
        assert_eq!(entries[0].amount, dec!(12.34));
        assert_eq!(h.default.submit_count(), 1);
        assert_eq!(h.fallback.submit_count(), 1);
    }

    #[tokio::test]
    async fn test_settle_on_success_leaves_failed_fallback_unresolved() {
        let default = ScriptedProcessor::healthy(Primary);
        default.set_submit_ok(false);
        let fallback = ScriptedProcessor::healthy(Fallback);
        fallback.set_submit_ok(false);
        let h = Harness::new(default, fallback, FallbackPolicy::SettleOnSuccess);

        let outcome = h.dispatcher.settle(&request(dec!(12.34))).await.unwrap();
        assert_eq!(outcome, Settlement::Unresolved);
        assert!(h.entries().await.is_empty());
        assert_eq!(h.fallback.submit_count(), 1);
    }

    #[tokio::test]
    async fn test_rejected_payload_is_not_handed_off() {
        let default = ScriptedProcessor::healthy(Primary);
        default.set_submit_rejected(true);
        let h = Harness::new(
            default,
            ScriptedProcessor::healthy(Fallback),
            FallbackPolicy::SettleOnAttempt,
        );

        let outcome = h.dispatcher.settle(&request(dec!(4.20))).await.unwrap();
        assert_eq!(outcome, Settlement::Unresolved);
        assert!(h.entries().await.is_empty());
        assert_eq!(h.default.submit_count(), 1);
        assert_eq!(h.fallback.submit_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_default_times_out_and_hands_off() {
        let default = ScriptedProcessor::healthy(Primary);
        default.set_submit_delay(std::time::Duration::from_secs(60));
        let h = Harness::new(
            default,
            ScriptedProcessor::healthy(Fallback),
            FallbackPolicy::SettleOnSuccess,
        );

        let started = tokio::time::Instant::now();
        let outcome = h.dispatcher.settle(&request(dec!(2))).await.unwrap();

        assert_eq!(outcome, Settlement::Settled(Fallback));
        assert!(started.elapsed() < std::time::Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected_before_routing() {
        let h = Harness::new(
            ScriptedProcessor::healthy(Primary),
            ScriptedProcessor::healthy(Fallback),
            FallbackPolicy::SettleOnAttempt,
        );
        let bad = PaymentRequest {
            correlation_id: Uuid::new_v4(),
            amount: dec!(-1),
        };

        let err = h.dispatcher.settle(&bad).await.unwrap_err();
        assert!(matches!(err, RelayError::InvalidRequest(_)));
        assert_eq!(h.default.probe_count(), 0);
        assert_eq!(h.default.submit_count(), 0);
    }

    #[tokio::test]
    async fn test_ledger_failure_is_reported() {
        let h = Harness::with_ledger(
            ScriptedProcessor::healthy(Primary),
            ScriptedProcessor::healthy(Fallback),
            FallbackPolicy::SettleOnAttempt,
            Ledger::new(Arc::new(UnavailableStore)),
        );

        let err = h.dispatcher.settle(&request(dec!(1))).await.unwrap_err();
        assert!(matches!(err, RelayError::Store(_)));
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(
            serde_json::from_str::<FallbackPolicy>("\"settle_on_success\"").unwrap(),
            FallbackPolicy::SettleOnSuccess
        );
        assert_eq!(FallbackPolicy::default(), FallbackPolicy::SettleOnAttempt);
    }
}
