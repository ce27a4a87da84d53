//! # Intake Queue
//!
//! Unbounded FIFO decoupling admission from settlement.
//!
//! Producers hold cheap `IntakeQueue` clones; the worker pool shares one
//! `IntakeReceiver`. Each item is handed to exactly one worker.

use crate::error::{RelayError, RelayResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Create a connected queue/receiver pair
pub fn intake_queue<T>() -> (IntakeQueue<T>, IntakeReceiver<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));

    (
        IntakeQueue {
            tx,
            depth: depth.clone(),
        },
        IntakeReceiver {
            rx: Arc::new(Mutex::new(rx)),
            depth,
        },
    )
}

/// Producer side
pub struct IntakeQueue<T> {
    tx: mpsc::UnboundedSender<T>,
    depth: Arc<AtomicUsize>,
}

impl<T> Clone for IntakeQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            depth: self.depth.clone(),
        }
    }
}

impl<T> IntakeQueue<T> {
    /// Admit an item without blocking.
    ///
    /// Fails with `QueueClosed` once the receiver is gone; the item is
    /// never dropped silently.
    pub fn enqueue(&self, item: T) -> RelayResult<()> {
        self.depth.fetch_add(1, Ordering::SeqCst);
        self.tx.send(item).map_err(|_| {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            RelayError::QueueClosed
        })
    }

    /// Items admitted but not yet dequeued
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side, shared by the worker pool
pub struct IntakeReceiver<T> {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<T>>>,
    depth: Arc<AtomicUsize>,
}

impl<T> Clone for IntakeReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            depth: self.depth.clone(),
        }
    }
}

impl<T> IntakeReceiver<T> {
    /// Wait for the next item.
    ///
    /// Returns `None` when `cancel` fires or every producer is gone.
    pub async fn dequeue(&self, cancel: &CancellationToken) -> Option<T> {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            item = async { self.rx.lock().await.recv().await } => item,
        };

        if item.is_some() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
        }
        item
    }
}
