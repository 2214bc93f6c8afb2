use herdlog_core::CoreError;
use herdlog_storage::{ConfigError, StorageError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("export failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("export encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Open-time schema failures that need a migration or a wipe to resolve.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            EngineError::Storage(
                StorageError::SchemaMismatch { .. }
                    | StorageError::NoMigrationPath { .. }
                    | StorageError::FutureVersion { .. }
                    | StorageError::MigrationFailed { .. }
            )
        )
    }
}
