use herdlog_core::{AnimalRecord, RecordId};

use crate::error::StorageError;

/// Record persistence. Every write is a single transaction: it either commits
/// in full or leaves the store untouched.
pub trait RecordStore {
    /// Insert with abort-on-conflict. An unassigned id gets a fresh identity;
    /// an explicit id that already exists fails with `ConstraintViolation`.
    fn insert(&mut self, record: &AnimalRecord) -> Result<RecordId, StorageError>;

    /// Rewrite every column of the row with `record.id`. Returns the number of
    /// rows changed; an unknown id changes nothing and is not an error.
    fn update(&mut self, record: &AnimalRecord) -> Result<usize, StorageError>;

    fn delete(&mut self, id: RecordId) -> Result<usize, StorageError>;

    /// Remove every row, then try to reclaim the freed space. Succeeds once the
    /// delete commits, whether or not compaction does.
    fn clear_all(&mut self) -> Result<usize, StorageError>;

    /// Advance the sync flag. Returns `false` when nothing changed, either
    /// because the id is unknown or the row was already synced.
    fn mark_synced(&mut self, id: RecordId) -> Result<bool, StorageError>;

    /// Like `mark_synced`, but only while the stored row still equals
    /// `record`. An edit or delete since `record` was read leaves the row
    /// alone and returns `false`.
    fn mark_synced_if_unchanged(&mut self, record: &AnimalRecord) -> Result<bool, StorageError>;

    fn get_by_id(&self, id: RecordId) -> Result<Option<AnimalRecord>, StorageError>;

    /// All records, newest capture first.
    fn get_all(&self) -> Result<Vec<AnimalRecord>, StorageError>;

    /// Records not yet acknowledged by the backend, in id order.
    fn list_unsynced(&self) -> Result<Vec<AnimalRecord>, StorageError>;

    fn count(&self) -> Result<u64, StorageError>;

    fn count_unsynced(&self) -> Result<u64, StorageError>;
}
