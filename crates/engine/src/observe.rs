use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use herdlog_core::AnimalRecord;

use crate::error::EngineError;
use crate::invalidation::ObserverId;
use crate::Store;

pub type Snapshot = Result<Vec<AnimalRecord>, EngineError>;

/// Live view of the full record list, newest capture first.
///
/// The first call yields the current table. Every later call blocks until a
/// write changes the table, then re-reads it. Signals that arrive while the
/// consumer is busy collapse into a single re-read, so snapshots may skip
/// intermediate states but never go backwards.
///
/// Dropping the observer (or calling [`cancel`](Self::cancel)) detaches it
/// without touching the store or other observers.
pub struct RecordsObserver {
    store: Store,
    id: ObserverId,
    signals: Receiver<()>,
    primed: bool,
}

impl RecordsObserver {
    pub(crate) fn new(store: Store) -> Self {
        let (id, signals) = store.inner.tracker.register();
        Self {
            store,
            id,
            signals,
            primed: false,
        }
    }

    /// Block until the next snapshot is available.
    pub fn next_snapshot(&mut self) -> Option<Snapshot> {
        if !self.primed {
            self.primed = true;
            return Some(self.store.get_all());
        }
        self.signals.recv().ok()?;
        self.drain();
        Some(self.store.get_all())
    }

    /// Like [`next_snapshot`](Self::next_snapshot), but gives up after
    /// `timeout` when the table has not changed.
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<Snapshot> {
        if !self.primed {
            self.primed = true;
            return Some(self.store.get_all());
        }
        match self.signals.recv_timeout(timeout) {
            Ok(()) => {
                self.drain();
                Some(self.store.get_all())
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn cancel(self) {}

    fn drain(&self) {
        while self.signals.try_recv().is_ok() {}
    }
}

impl Iterator for RecordsObserver {
    type Item = Snapshot;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_snapshot()
    }
}

impl Drop for RecordsObserver {
    fn drop(&mut self) {
        self.store.inner.tracker.unregister(self.id);
    }
}
