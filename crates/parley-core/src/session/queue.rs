//! Preemptive work queue.
//!
//! Operations run one at a time in submission order. Submitting a new
//! preemptible operation cancels the token of the one before it; the
//! cancelled operation still runs to completion (observing its token) before
//! its successor starts, so every operation sees the state its predecessor
//! left behind.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct QueueSlot {
    /// Last spawned operation; the next one waits for it.
    tail: Option<JoinHandle<()>>,
    /// Token of the most recent preemptible operation.
    active: Option<CancellationToken>,
    closed: bool,
}

#[derive(Default)]
struct PendingCounter {
    pending: AtomicUsize,
    idle: Notify,
}

/// Decrements the pending count when an operation's task ends, including by
/// panic.
struct PendingGuard(Arc<PendingCounter>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Serialized, cancellable operations for one session.
pub struct PreemptiveWorkQueue {
    slot: Mutex<QueueSlot>,
    counter: Arc<PendingCounter>,
}

impl PreemptiveWorkQueue {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(QueueSlot::default()),
            counter: Arc::new(PendingCounter::default()),
        }
    }

    /// Queue a preemptible operation and cancel the one before it.
    ///
    /// Returns immediately. The operation receives its own cancellation
    /// token, which fires when a later operation is enqueued or the queue
    /// shuts down. Returns `false` if the queue is shut down.
    pub fn enqueue<F, Fut, E>(&self, label: &'static str, operation: F) -> bool
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.closed {
            tracing::warn!(operation = label, "queue shut down, dropping operation");
            return false;
        }

        let token = CancellationToken::new();
        if let Some(previous) = slot.active.replace(token.clone()) {
            if !previous.is_cancelled() {
                tracing::debug!(operation = label, "preempting in-flight operation");
            }
            previous.cancel();
        }

        let observed = token.clone();
        self.chain(&mut slot, label, observed, async move { operation(token).await });
        true
    }

    /// Queue an ordered step that does not preempt anything.
    ///
    /// Used for bookkeeping that must observe the state left by earlier
    /// operations (e.g. playback notifications) without cancelling them.
    pub fn post<F, Fut, E>(&self, label: &'static str, step: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.closed {
            tracing::debug!(operation = label, "queue shut down, dropping step");
            return false;
        }
        self.chain(&mut slot, label, CancellationToken::new(), async move {
            step().await
        });
        true
    }

    /// Wait until every queued operation has finished.
    pub async fn drain(&self) {
        loop {
            let mut notified = std::pin::pin!(self.counter.idle.notified());
            notified.as_mut().enable();
            if self.counter.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Cancel the in-flight operation, refuse new ones, and wait for the
    /// queue to empty.
    pub async fn shutdown(&self) {
        {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            slot.closed = true;
            if let Some(active) = slot.active.take() {
                active.cancel();
            }
        }
        self.drain().await;
    }

    /// Number of operations queued or running.
    pub fn pending(&self) -> usize {
        self.counter.pending.load(Ordering::SeqCst)
    }

    fn chain<Fut, E>(
        &self,
        slot: &mut QueueSlot,
        label: &'static str,
        token: CancellationToken,
        work: Fut,
    ) where
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let previous = slot.tail.take();
        self.counter.pending.fetch_add(1, Ordering::SeqCst);
        let guard = PendingGuard(Arc::clone(&self.counter));

        let handle = tokio::spawn(async move {
            let _guard = guard;
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    if e.is_panic() {
                        tracing::error!("previous session operation panicked");
                    }
                }
            }

            match work.await {
                Ok(()) => {}
                Err(e) if token.is_cancelled() => {
                    tracing::debug!(operation = label, error = %e, "operation ended after preemption");
                }
                Err(e) => {
                    tracing::warn!(operation = label, error = %e, "operation failed");
                }
            }
        });
        slot.tail = Some(handle);
    }
}

impl Default for PreemptiveWorkQueue {
    fn default() -> Self {
        Self::new()
    }
}
