pub mod config;
pub mod error;
pub mod migrate;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use config::{ConfigError, StoreConfig, Synchronous};
pub use error::StorageError;
pub use migrate::{Migration, MigrationRegistry, SqlMigration};
pub use schema::{SCHEMA_VERSION, TableDefinition};
pub use sqlite::SqliteStorage;
pub use traits::*;
