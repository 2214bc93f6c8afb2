use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

use parking_lot::Mutex;

pub(crate) type ObserverId = u64;

/// Fans out "the records table changed" signals to registered observers.
/// Signals carry no payload; observers re-read the table themselves.
#[derive(Default)]
pub(crate) struct InvalidationTracker {
    next_id: AtomicU64,
    observers: Mutex<Vec<(ObserverId, Sender<()>)>>,
}

impl InvalidationTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self) -> (ObserverId, Receiver<()>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel();
        self.observers.lock().push((id, tx));
        tracing::debug!(observer_id = id, "observer registered");
        (id, rx)
    }

    pub(crate) fn unregister(&self, id: ObserverId) {
        self.observers.lock().retain(|(observer, _)| *observer != id);
        tracing::debug!(observer_id = id, "observer detached");
    }

    /// Signal every live observer. Observers whose receiver is gone are pruned.
    pub(crate) fn notify(&self) {
        self.observers.lock().retain(|(_, tx)| tx.send(()).is_ok());
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.lock().len()
    }
}
