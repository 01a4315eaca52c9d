use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Notify, mpsc};

use crate::domain::errors::RepositoryError;

use super::snapshot::Snapshot;

pub type SnapshotEvent = Result<Snapshot, RepositoryError>;

/// Shared cancellation flag between a subscriber and the feed producing its
/// snapshots. Cancelling is idempotent.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// A live feed of full snapshots of the product collection.
///
/// Dropping the subscription cancels it, which tells the producer to stop.
#[derive(Debug)]
pub struct SnapshotSubscription {
    receiver: mpsc::Receiver<SnapshotEvent>,
    cancel: CancelHandle,
}

impl SnapshotSubscription {
    pub fn new(receiver: mpsc::Receiver<SnapshotEvent>, cancel: CancelHandle) -> Self {
        Self { receiver, cancel }
    }

    /// Creates a subscription together with the producer side of its channel.
    pub fn channel(capacity: usize) -> (mpsc::Sender<SnapshotEvent>, CancelHandle, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        let cancel = CancelHandle::new();
        (sender, cancel.clone(), Self::new(receiver, cancel))
    }

    /// Next event, or `None` once the feed ended or was cancelled. Events
    /// already queued when the subscription is cancelled are discarded.
    pub async fn next(&mut self) -> Option<SnapshotEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let event = tokio::select! {
            _ = self.cancel.cancelled() => None,
            event = self.receiver.recv() => event,
        };
        if self.cancel.is_cancelled() {
            return None;
        }
        event
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for SnapshotSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
