use std::path::Path;

use rusqlite::{Connection, OpenFlags, OptionalExtension, Params};

use herdlog_core::{
    AnimalRecord, Measurements, RecordId,
    record::{date_from_millis, date_to_millis},
};

use crate::config::StoreConfig;
use crate::error::StorageError;
use crate::migrate::MigrationRegistry;
use crate::traits::RecordStore;

const RECORD_COLUMNS: &str = "id, animal_id, date, image_path, body_length, height, chest_width, rump_angle, atc_score, synced";

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(config: &StoreConfig) -> Result<Self, StorageError> {
        Self::open_with_migrations(config, &MigrationRegistry::new())
    }

    /// Open the writer connection, creating, migrating or rejecting the schema.
    pub fn open_with_migrations(
        config: &StoreConfig,
        migrations: &MigrationRegistry,
    ) -> Result<Self, StorageError> {
        let mut conn = match &config.path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        crate::schema::init_schema(&mut conn, config, migrations)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::open(&StoreConfig::in_memory())
    }

    /// Read-only companion connection for a file the writer has already opened.
    /// Skips schema work entirely.
    pub fn open_reader(path: &Path, config: &StoreConfig) -> Result<Self, StorageError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(config.busy_timeout)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    fn query_records<P: Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<AnimalRecord>, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let records = stmt
            .query_map(params, read_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn try_reclaim_space(&self) -> Result<(), StorageError> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(FULL);")?;
        if self.conn.is_autocommit() {
            self.conn.execute_batch("VACUUM")?;
        }
        Ok(())
    }

    /// Checkpoint and compact after a bulk delete. The rows are already gone
    /// when this runs, so a failure is logged rather than returned.
    fn reclaim_space(&self) {
        if let Err(e) = self.try_reclaim_space() {
            tracing::warn!(error = %e, "could not reclaim space after clearing records");
        }
    }
}

fn read_record(row: &rusqlite::Row) -> rusqlite::Result<AnimalRecord> {
    let millis: i64 = row.get(2)?;
    let date = date_from_millis(millis).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Integer, Box::new(e))
    })?;
    Ok(AnimalRecord {
        id: RecordId::new(row.get(0)?),
        animal_id: row.get(1)?,
        date,
        image_path: row.get(3)?,
        measurements: Measurements {
            body_length: row.get(4)?,
            height: row.get(5)?,
            chest_width: row.get(6)?,
            rump_angle: row.get(7)?,
        },
        atc_score: row.get(8)?,
        synced: row.get(9)?,
    })
}

impl RecordStore for SqliteStorage {
    fn insert(&mut self, record: &AnimalRecord) -> Result<RecordId, StorageError> {
        record.validate()?;
        let explicit_id = record.id.is_assigned().then(|| record.id.get());

        let tx = self.conn.transaction()?;
        tx.execute(
            &format!("INSERT OR ABORT INTO animal_records ({RECORD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
            rusqlite::params![
                explicit_id,
                record.animal_id,
                date_to_millis(&record.date),
                record.image_path,
                record.measurements.body_length,
                record.measurements.height,
                record.measurements.chest_width,
                record.measurements.rump_angle,
                record.atc_score,
                record.synced,
            ],
        )
        .map_err(StorageError::from_write)?;
        let id = RecordId::new(tx.last_insert_rowid());
        tx.commit()?;

        tracing::debug!(record_id = %id, animal_id = %record.animal_id, "inserted record");
        Ok(id)
    }

    fn update(&mut self, record: &AnimalRecord) -> Result<usize, StorageError> {
        record.validate()?;

        let tx = self.conn.transaction()?;
        let changed = tx
            .execute(
                "UPDATE OR ABORT animal_records SET animal_id = ?1, date = ?2, image_path = ?3, body_length = ?4, height = ?5, chest_width = ?6, rump_angle = ?7, atc_score = ?8, synced = ?9 WHERE id = ?10",
                rusqlite::params![
                    record.animal_id,
                    date_to_millis(&record.date),
                    record.image_path,
                    record.measurements.body_length,
                    record.measurements.height,
                    record.measurements.chest_width,
                    record.measurements.rump_angle,
                    record.atc_score,
                    record.synced,
                    record.id.get(),
                ],
            )
            .map_err(StorageError::from_write)?;
        tx.commit()?;

        tracing::debug!(record_id = %record.id, changed, "updated record");
        Ok(changed)
    }

    fn delete(&mut self, id: RecordId) -> Result<usize, StorageError> {
        let tx = self.conn.transaction()?;
        let removed = tx
            .execute("DELETE FROM animal_records WHERE id = ?1", [id.get()])
            .map_err(StorageError::from_write)?;
        tx.commit()?;

        tracing::debug!(record_id = %id, removed, "deleted record");
        Ok(removed)
    }

    fn clear_all(&mut self) -> Result<usize, StorageError> {
        let tx = self.conn.transaction()?;
        let removed = tx
            .execute("DELETE FROM animal_records", [])
            .map_err(StorageError::from_write)?;
        tx.commit()?;

        self.reclaim_space();
        tracing::info!(removed, "cleared all records");
        Ok(removed)
    }

    fn mark_synced(&mut self, id: RecordId) -> Result<bool, StorageError> {
        let tx = self.conn.transaction()?;
        let changed = tx
            .execute(
                "UPDATE animal_records SET synced = 1 WHERE id = ?1 AND synced = 0",
                [id.get()],
            )
            .map_err(StorageError::from_write)?;
        tx.commit()?;

        tracing::debug!(record_id = %id, changed, "marked record synced");
        Ok(changed > 0)
    }

    fn mark_synced_if_unchanged(&mut self, record: &AnimalRecord) -> Result<bool, StorageError> {
        let tx = self.conn.transaction()?;
        let changed = tx
            .execute(
                "UPDATE animal_records SET synced = 1 WHERE id = ?1 AND synced = 0 AND animal_id = ?2 AND date = ?3 AND image_path = ?4 AND body_length = ?5 AND height = ?6 AND chest_width = ?7 AND rump_angle = ?8 AND atc_score = ?9",
                rusqlite::params![
                    record.id.get(),
                    record.animal_id,
                    date_to_millis(&record.date),
                    record.image_path,
                    record.measurements.body_length,
                    record.measurements.height,
                    record.measurements.chest_width,
                    record.measurements.rump_angle,
                    record.atc_score,
                ],
            )
            .map_err(StorageError::from_write)?;
        tx.commit()?;

        if changed == 0 {
            tracing::debug!(record_id = %record.id, "row changed since read, left unsynced");
        }
        Ok(changed > 0)
    }

    fn get_by_id(&self, id: RecordId) -> Result<Option<AnimalRecord>, StorageError> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM animal_records WHERE id = ?1"),
                [id.get()],
                read_record,
            )
            .optional()?;
        Ok(record)
    }

    fn get_all(&self) -> Result<Vec<AnimalRecord>, StorageError> {
        self.query_records(
            &format!("SELECT {RECORD_COLUMNS} FROM animal_records ORDER BY date DESC, id DESC"),
            [],
        )
    }

    fn list_unsynced(&self) -> Result<Vec<AnimalRecord>, StorageError> {
        self.query_records(
            &format!("SELECT {RECORD_COLUMNS} FROM animal_records WHERE synced = 0 ORDER BY id"),
            [],
        )
    }

    fn count(&self) -> Result<u64, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM animal_records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_unsynced(&self) -> Result<u64, StorageError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM animal_records WHERE synced = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
