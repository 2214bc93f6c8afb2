pub mod error;
pub mod export;
mod invalidation;
pub mod observe;
pub mod sync;

pub use error::EngineError;
pub use export::ExportFormat;
pub use observe::{RecordsObserver, Snapshot};
pub use sync::{SyncReport, UploadError, Uploader};

use std::sync::Arc;

use parking_lot::Mutex;

use herdlog_core::{AnimalRecord, RecordId};
use herdlog_storage::{MigrationRegistry, RecordStore, SqliteStorage, StorageError, StoreConfig};

use crate::invalidation::InvalidationTracker;

/// Shared handle to the record store. Cheap to clone; all clones see the same
/// database and the same observers.
///
/// Writes go through a single writer connection, one transaction each, and
/// block the caller until commit. File-backed stores read through a separate
/// read-only connection so queries and observers see the last committed state
/// without queueing behind the writer. In-memory stores share the writer.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    writer: Mutex<SqliteStorage>,
    reader: Option<Mutex<SqliteStorage>>,
    tracker: InvalidationTracker,
}

impl Store {
    pub fn open(config: &StoreConfig) -> Result<Self, EngineError> {
        Self::open_with_migrations(config, &MigrationRegistry::new())
    }

    /// Open the store, running registered migrations if the file is behind.
    /// Fails with a schema error if the on-disk shape cannot be reconciled.
    pub fn open_with_migrations(
        config: &StoreConfig,
        migrations: &MigrationRegistry,
    ) -> Result<Self, EngineError> {
        let writer = SqliteStorage::open_with_migrations(config, migrations).inspect_err(|e| {
            tracing::warn!(error = %e, path = ?config.path, "failed to open record store");
        })?;
        let reader = match &config.path {
            Some(path) => Some(Mutex::new(SqliteStorage::open_reader(path, config)?)),
            None => None,
        };
        tracing::info!(path = ?config.path, "opened record store");

        Ok(Self {
            inner: Arc::new(StoreInner {
                writer: Mutex::new(writer),
                reader,
                tracker: InvalidationTracker::new(),
            }),
        })
    }

    pub fn open_in_memory() -> Result<Self, EngineError> {
        Self::open(&StoreConfig::in_memory())
    }

    fn read<T>(
        &self,
        query: impl FnOnce(&SqliteStorage) -> Result<T, StorageError>,
    ) -> Result<T, EngineError> {
        let result = match &self.inner.reader {
            Some(reader) => query(&*reader.lock()),
            None => query(&*self.inner.writer.lock()),
        };
        Ok(result?)
    }

    /// Run one write under the writer lock; observers are signalled after the
    /// lock is released, and only when `changed` says the table moved.
    fn write<T>(
        &self,
        mutation: impl FnOnce(&mut SqliteStorage) -> Result<T, StorageError>,
        changed: impl FnOnce(&T) -> bool,
    ) -> Result<T, EngineError> {
        let outcome = {
            let mut writer = self.inner.writer.lock();
            mutation(&mut *writer)?
        };
        if changed(&outcome) {
            self.inner.tracker.notify();
        }
        Ok(outcome)
    }

    pub fn insert(&self, record: &AnimalRecord) -> Result<RecordId, EngineError> {
        self.write(|s| s.insert(record), |_| true)
    }

    pub fn update(&self, record: &AnimalRecord) -> Result<usize, EngineError> {
        self.write(|s| s.update(record), |changed| *changed > 0)
    }

    pub fn delete(&self, record: &AnimalRecord) -> Result<usize, EngineError> {
        self.delete_by_id(record.id)
    }

    pub fn delete_by_id(&self, id: RecordId) -> Result<usize, EngineError> {
        self.write(|s| s.delete(id), |removed| *removed > 0)
    }

    /// Remove every record and compact the file. Slower than `delete`; meant
    /// for user-initiated wipes and test teardown.
    pub fn clear_all(&self) -> Result<usize, EngineError> {
        self.write(|s| s.clear_all(), |_| true)
    }

    pub fn mark_synced(&self, id: RecordId) -> Result<bool, EngineError> {
        self.write(|s| s.mark_synced(id), |changed| *changed)
    }

    /// Mark `record` synced only if the stored row still matches it.
    pub fn mark_synced_if_unchanged(&self, record: &AnimalRecord) -> Result<bool, EngineError> {
        self.write(|s| s.mark_synced_if_unchanged(record), |changed| *changed)
    }

    pub fn get_by_id(&self, id: RecordId) -> Result<Option<AnimalRecord>, EngineError> {
        self.read(|s| s.get_by_id(id))
    }

    pub fn get_all(&self) -> Result<Vec<AnimalRecord>, EngineError> {
        self.read(|s| s.get_all())
    }

    pub fn list_unsynced(&self) -> Result<Vec<AnimalRecord>, EngineError> {
        self.read(|s| s.list_unsynced())
    }

    pub fn count(&self) -> Result<u64, EngineError> {
        self.read(|s| s.count())
    }

    pub fn count_unsynced(&self) -> Result<u64, EngineError> {
        self.read(|s| s.count_unsynced())
    }

    pub fn observe_all(&self) -> RecordsObserver {
        RecordsObserver::new(self.clone())
    }

    pub fn observer_count(&self) -> usize {
        self.inner.tracker.len()
    }
}
