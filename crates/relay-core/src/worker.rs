//! # Worker Pool
//!
//! Long-running tasks draining the intake queue into the dispatcher.
//!
//! A failed settlement is logged and the loop moves on. On cancellation
//! workers stop dequeuing; an item already in hand may finish or be
//! abandoned (at-most-once under shutdown).

use crate::dispatcher::{Dispatcher, Settlement};
use crate::payment::PaymentRequest;
use crate::queue::IntakeReceiver;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Handle to the running workers
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Spawn `count` workers (at least one) sharing `receiver`
    pub fn spawn(
        count: usize,
        receiver: IntakeReceiver<PaymentRequest>,
        dispatcher: Arc<Dispatcher>,
        cancel: CancellationToken,
    ) -> Self {
        let handles = (0..count.max(1))
            .map(|id| {
                let receiver = receiver.clone();
                let dispatcher = Arc::clone(&dispatcher);
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    worker_loop(id, receiver, dispatcher, cancel).await;
                })
            })
            .collect();

        Self { handles, cancel }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Stop dequeuing and wait for every worker to exit
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = ?e, "Worker task panicked");
            }
        }
        info!("Worker pool stopped");
    }
}

#[instrument(name = "payment_worker", skip(receiver, dispatcher, cancel))]
async fn worker_loop(
    id: usize,
    receiver: IntakeReceiver<PaymentRequest>,
    dispatcher: Arc<Dispatcher>,
    cancel: CancellationToken,
) {
    debug!("Worker started");

    while let Some(request) = receiver.dequeue(&cancel).await {
        match dispatcher.settle(&request).await {
            Ok(Settlement::Settled(processor)) => {
                debug!(correlation_id = %request.correlation_id, %processor, "Settled");
            }
            Ok(Settlement::Unresolved) => {
                warn!(correlation_id = %request.correlation_id, "Payment left unresolved");
            }
            Err(e) => {
                error!(correlation_id = %request.correlation_id, error = %e, "Settlement failed");
            }
        }
    }

    debug!("Worker stopped");
}
