use std::collections::BTreeMap;

use rusqlite::Connection;

use crate::error::StorageError;
use crate::schema::stamp_version;

/// One schema step from `source_version()` to `source_version() + 1`.
///
/// Steps run inside the opener's transaction; returning an error rolls back the
/// whole chain.
pub trait Migration: Send + Sync {
    fn source_version(&self) -> i32;

    fn apply(&self, conn: &Connection) -> Result<(), StorageError>;
}

/// A step expressed as a batch of SQL statements.
pub struct SqlMigration {
    source_version: i32,
    sql: String,
}

impl SqlMigration {
    pub fn new(source_version: i32, sql: impl Into<String>) -> Self {
        Self {
            source_version,
            sql: sql.into(),
        }
    }
}

impl Migration for SqlMigration {
    fn source_version(&self) -> i32 {
        self.source_version
    }

    fn apply(&self, conn: &Connection) -> Result<(), StorageError> {
        conn.execute_batch(&self.sql)?;
        Ok(())
    }
}

/// Linear chain of registered steps, keyed by source version.
#[derive(Default)]
pub struct MigrationRegistry {
    steps: BTreeMap<i32, Box<dyn Migration>>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step. A later registration for the same source version
    /// replaces the earlier one.
    pub fn register(&mut self, step: Box<dyn Migration>) -> &mut Self {
        self.steps.insert(step.source_version(), step);
        self
    }

    pub fn register_sql(&mut self, source_version: i32, sql: impl Into<String>) -> &mut Self {
        self.register(Box::new(SqlMigration::new(source_version, sql)))
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Apply every step from `from` up to `to`, stamping each reached version.
    /// The full chain is resolved before anything runs.
    pub fn run(&self, conn: &Connection, from: i32, to: i32) -> Result<(), StorageError> {
        let mut plan = Vec::new();
        for version in from..to {
            let step = self.steps.get(&version).ok_or(StorageError::NoMigrationPath {
                from: version,
                to: version + 1,
            })?;
            plan.push(step);
        }

        for step in plan {
            let source = step.source_version();
            let target = source + 1;
            step.apply(conn)
                .map_err(|e| StorageError::MigrationFailed {
                    from: source,
                    to: target,
                    reason: e.to_string(),
                })?;
            stamp_version(conn, target)?;
            tracing::info!(from = source, to = target, "applied schema migration");
        }
        Ok(())
    }
}
