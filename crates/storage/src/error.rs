use thiserror::Error;

use crate::schema::TableDefinition;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("schema mismatch for {}\n expected: {expected}\n found: {found}", expected.name)]
    SchemaMismatch {
        expected: Box<TableDefinition>,
        found: Box<TableDefinition>,
    },

    #[error("no migration registered from schema version {from} to {to}")]
    NoMigrationPath { from: i32, to: i32 },

    #[error("schema version {found} is newer than supported version {expected}")]
    FutureVersion { found: i32, expected: i32 },

    #[error("migration {from} -> {to} failed: {reason}")]
    MigrationFailed { from: i32, to: i32, reason: String },

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("core error: {0}")]
    Core(#[from] herdlog_core::CoreError),
}

impl StorageError {
    /// Map SQLite constraint failures onto `ConstraintViolation`; everything else
    /// stays a storage I/O error.
    pub(crate) fn from_write(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(failure, msg)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StorageError::ConstraintViolation(msg.unwrap_or_else(|| failure.to_string()))
            }
            other => StorageError::Sqlite(other),
        }
    }
}
