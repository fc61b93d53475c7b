// crates/rce-store-sqlite/src/connection.rs
// ============================================================================
// Module: Connection Setup
// Description: Path validation, pragma configuration, and schema init.
// Purpose: Open a durable SQLite connection shared by every repository.
// Dependencies: rusqlite
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::error::SqliteStoreError;

const SCHEMA_VERSION: i64 = 1;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Configuration for a `SQLite`-backed store.
#[derive(Debug, Clone)]
pub struct SqliteStoreConfig {
    pub path: PathBuf,
    pub busy_timeout_ms: u64,
}

impl SqliteStoreConfig {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

fn apply_pragmas(connection: &Connection, config: &SqliteStoreConfig) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = wal; PRAGMA synchronous = normal;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Opens a durable `SQLite` connection and initializes the schema.
///
/// # Errors
/// Returns [`SqliteStoreError`] when the path is invalid or the database
/// cannot be opened or initialized.
pub fn open(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    validate_store_path(&config.path)?;
    ensure_parent_dir(&config.path)?;

    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    initialize_schema(&connection)?;
    Ok(connection)
}

fn initialize_schema(connection: &Connection) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = connection
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    if version.is_none() {
        connection
            .execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    }

    connection
        .execute_batch(
            "CREATE TABLE IF NOT EXISTS tenants (
                id TEXT PRIMARY KEY,
                customer_id TEXT NOT NULL,
                json BLOB NOT NULL
            );
            CREATE TABLE IF NOT EXISTS customers (
                id TEXT PRIMARY KEY,
                json BLOB NOT NULL
            );
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                customer_id TEXT NOT NULL,
                status TEXT NOT NULL,
                native_task_id TEXT,
                json BLOB NOT NULL
            );
            CREATE INDEX IF NOT EXISTS jobs_by_tenant ON jobs (tenant_id);
            CREATE INDEX IF NOT EXISTS jobs_by_native_task_id ON jobs (native_task_id);
            CREATE TABLE IF NOT EXISTS batch_results (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                customer_id TEXT NOT NULL,
                status TEXT NOT NULL,
                dedup_key TEXT,
                json BLOB NOT NULL
            );
            CREATE INDEX IF NOT EXISTS batch_results_by_tenant ON batch_results (tenant_id);
            CREATE UNIQUE INDEX IF NOT EXISTS batch_results_by_dedup_key ON batch_results (dedup_key);
            CREATE TABLE IF NOT EXISTS scheduled_jobs (
                id TEXT PRIMARY KEY,
                customer_id TEXT NOT NULL,
                tenant_id TEXT NOT NULL,
                json BLOB NOT NULL
            );
            CREATE TABLE IF NOT EXISTS licenses (
                license_key TEXT PRIMARY KEY,
                json BLOB NOT NULL
            );
            CREATE TABLE IF NOT EXISTS rule_sources (
                id TEXT PRIMARY KEY,
                customer_id TEXT NOT NULL,
                json BLOB NOT NULL
            );
            CREATE TABLE IF NOT EXISTS rules (
                name TEXT NOT NULL,
                rule_source_id TEXT NOT NULL,
                json BLOB NOT NULL,
                PRIMARY KEY (name, rule_source_id)
            );
            CREATE TABLE IF NOT EXISTS rulesets (
                customer_id TEXT NOT NULL,
                name TEXT NOT NULL,
                version TEXT NOT NULL,
                json BLOB NOT NULL,
                PRIMARY KEY (customer_id, name, version)
            );
            CREATE TABLE IF NOT EXISTS rule_metadata (
                rule_name TEXT PRIMARY KEY,
                json BLOB NOT NULL
            );",
        )
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}
