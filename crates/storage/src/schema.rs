use std::collections::BTreeMap;
use std::fmt;

use rusqlite::{Connection, OptionalExtension, TransactionBehavior};

use crate::config::StoreConfig;
use crate::error::StorageError;
use crate::migrate::MigrationRegistry;

pub const SCHEMA_VERSION: i32 = 1;

pub const RECORDS_TABLE: &str = "animal_records";

/// (name, declared type, NOT NULL, primary key position)
const EXPECTED_COLUMNS: &[(&str, &str, bool, i32)] = &[
    ("id", "INTEGER", true, 1),
    ("animal_id", "TEXT", true, 0),
    ("date", "INTEGER", true, 0),
    ("image_path", "TEXT", true, 0),
    ("body_length", "REAL", true, 0),
    ("height", "REAL", true, 0),
    ("chest_width", "REAL", true, 0),
    ("rump_angle", "REAL", true, 0),
    ("atc_score", "INTEGER", true, 0),
    ("synced", "INTEGER", true, 0),
];

const VERSION_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
";

const RECORDS_TABLE_SQL: &str = "
CREATE TABLE animal_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    animal_id TEXT NOT NULL,
    date INTEGER NOT NULL,
    image_path TEXT NOT NULL,
    body_length REAL NOT NULL,
    height REAL NOT NULL,
    chest_width REAL NOT NULL,
    rump_angle REAL NOT NULL,
    atc_score INTEGER NOT NULL,
    synced INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_animal_records_date ON animal_records (date DESC, id DESC);
CREATE INDEX IF NOT EXISTS idx_animal_records_unsynced ON animal_records (id) WHERE synced = 0;
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: String,
    pub not_null: bool,
    pub primary_key_position: i32,
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.sql_type)?;
        if self.not_null {
            write!(f, " NOT NULL")?;
        }
        if self.primary_key_position > 0 {
            write!(f, " PK{}", self.primary_key_position)?;
        }
        Ok(())
    }
}

/// Shape of a table as seen through `PRAGMA table_info`. Columns are keyed by
/// name so declaration order does not matter.
///
/// `autoincrement` comes from the stored DDL: `table_info` cannot tell an
/// `AUTOINCREMENT` key, which never hands out a used id again, from a plain
/// rowid alias, which does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: BTreeMap<String, ColumnDef>,
    pub autoincrement: bool,
}

impl TableDefinition {
    pub fn is_missing(&self) -> bool {
        self.columns.is_empty()
    }
}

impl fmt::Display for TableDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_missing() {
            return write!(f, "{}(<missing>)", self.name);
        }
        write!(f, "{}(", self.name)?;
        for (i, column) in self.columns.values().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{column}")?;
        }
        write!(f, ")")?;
        if self.autoincrement {
            write!(f, " AUTOINCREMENT")?;
        }
        Ok(())
    }
}

pub fn expected_definition() -> TableDefinition {
    let columns = EXPECTED_COLUMNS
        .iter()
        .map(|&(name, sql_type, not_null, pk)| {
            (
                name.to_string(),
                ColumnDef {
                    name: name.to_string(),
                    sql_type: sql_type.to_string(),
                    not_null,
                    primary_key_position: pk,
                },
            )
        })
        .collect();
    TableDefinition {
        name: RECORDS_TABLE.to_string(),
        columns,
        autoincrement: true,
    }
}

pub fn read_definition(conn: &Connection, table: &str) -> Result<TableDefinition, StorageError> {
    let mut stmt =
        conn.prepare("SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1)")?;
    let rows = stmt.query_map([table], |row| {
        Ok(ColumnDef {
            name: row.get(0)?,
            sql_type: row.get::<_, String>(1)?.to_uppercase(),
            not_null: row.get(2)?,
            primary_key_position: row.get(3)?,
        })
    })?;

    let mut columns = BTreeMap::new();
    for column in rows {
        let column = column?;
        columns.insert(column.name.clone(), column);
    }
    Ok(TableDefinition {
        name: table.to_string(),
        columns,
        autoincrement: declares_autoincrement(conn, table)?,
    })
}

fn declares_autoincrement(conn: &Connection, table: &str) -> Result<bool, StorageError> {
    let sql: Option<String> = conn
        .query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(sql.is_some_and(|sql| sql.to_uppercase().contains("AUTOINCREMENT")))
}

/// Highest version recorded in `schema_version`, or `None` on a fresh file.
pub fn stored_version(conn: &Connection) -> Result<Option<i32>, StorageError> {
    if !table_exists(conn, "schema_version")? {
        return Ok(None);
    }
    let version: Option<i32> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(version)
}

pub(crate) fn stamp_version(conn: &Connection, version: i32) -> Result<(), StorageError> {
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, unixepoch())",
        [version],
    )?;
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool, StorageError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn validate(conn: &Connection) -> Result<(), StorageError> {
    let expected = expected_definition();
    let found = read_definition(conn, RECORDS_TABLE)?;
    if expected != found {
        tracing::warn!(%expected, %found, "on-disk schema does not match");
        return Err(StorageError::SchemaMismatch {
            expected: Box::new(expected),
            found: Box::new(found),
        });
    }
    Ok(())
}

pub(crate) fn apply_pragmas(conn: &Connection, config: &StoreConfig) -> Result<(), StorageError> {
    conn.busy_timeout(config.busy_timeout)?;
    conn.execute_batch(&format!(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = {};
        PRAGMA cache_size = -{};
        PRAGMA foreign_keys = ON;
    ",
        config.synchronous.as_str(),
        config.cache_size_kib,
    ))?;
    Ok(())
}

/// Bring the connection to `SCHEMA_VERSION` or refuse to open.
///
/// Everything happens in one immediate transaction: table creation and the
/// version stamp land together, a migration chain either fully applies or not
/// at all, and a failed validation leaves the file as it was.
pub fn init_schema(
    conn: &mut Connection,
    config: &StoreConfig,
    migrations: &MigrationRegistry,
) -> Result<(), StorageError> {
    apply_pragmas(conn, config)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let stored = stored_version(&tx)?;
    tx.execute_batch(VERSION_TABLE_SQL)?;

    match stored {
        None if !table_exists(&tx, RECORDS_TABLE)? => {
            tx.execute_batch(RECORDS_TABLE_SQL)?;
            stamp_version(&tx, SCHEMA_VERSION)?;
            tracing::info!(version = SCHEMA_VERSION, "created record schema");
        }
        None => {
            validate(&tx)?;
            stamp_version(&tx, SCHEMA_VERSION)?;
            tracing::info!(version = SCHEMA_VERSION, "adopted unversioned record table");
        }
        Some(version) if version == SCHEMA_VERSION => validate(&tx)?,
        Some(version) if version > SCHEMA_VERSION => {
            return Err(StorageError::FutureVersion {
                found: version,
                expected: SCHEMA_VERSION,
            });
        }
        Some(version) => {
            migrations.run(&tx, version, SCHEMA_VERSION)?;
            validate(&tx)?;
        }
    }

    tx.commit()?;
    Ok(())
}
