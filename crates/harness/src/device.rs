use std::path::PathBuf;

use herdlog_core::RecordId;
use herdlog_engine::{EngineError, Store};
use herdlog_storage::{MigrationRegistry, StoreConfig};
use tempfile::TempDir;

use crate::sample_record;

/// A capture device with its own store, in memory or in a temp directory.
pub struct TestDevice {
    pub store: Store,
    dir: Option<TempDir>,
}

impl TestDevice {
    pub fn new() -> Result<Self, EngineError> {
        Ok(Self {
            store: Store::open_in_memory()?,
            dir: None,
        })
    }

    /// File-backed device, so reads go through the separate reader connection.
    pub fn on_disk() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let store = Store::open(&StoreConfig::at(dir.path().join("herd.db")))?;
        Ok(Self {
            store,
            dir: Some(dir),
        })
    }

    pub fn db_path(&self) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.path().join("herd.db"))
    }

    /// Close and reopen a file-backed store. In-memory devices are left as-is.
    pub fn reopen(&mut self, migrations: &MigrationRegistry) -> Result<(), EngineError> {
        if let Some(path) = self.db_path() {
            self.store = Store::open_with_migrations(&StoreConfig::at(path), migrations)?;
        }
        Ok(())
    }

    /// Capture a sample record and store it.
    pub fn capture(
        &self,
        animal_id: &str,
        day: i64,
        atc_score: i32,
    ) -> Result<RecordId, EngineError> {
        self.store.insert(&sample_record(animal_id, day, atc_score))
    }
}
